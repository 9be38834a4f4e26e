//! Structured tag predicates lowered to SQL clause fragments.
//!
//! Filters compile per operator: all AND filters collapse to one
//! `Media.DBID IN (… INTERSECT …)` clause, each NOT filter becomes its own
//! `NOT EXISTS` clause, and all OR filters collapse to one `EXISTS` clause
//! with an OR'd predicate list. INTERSECT cuts candidate sets early on
//! indexed join columns; NOT EXISTS avoids anti-join regressions; a single
//! EXISTS covers the whole OR group without N correlated subqueries.
//!
//! Every user-supplied value is parameter-bound; none reaches the SQL text.

use mediadex_common::{TagFilter, TagOp};

const AND_SUBQUERY: &str = "SELECT MediaTags.MediaDBID FROM MediaTags \
     INNER JOIN Tags ON Tags.DBID = MediaTags.TagDBID \
     INNER JOIN TagTypes ON TagTypes.DBID = Tags.TypeDBID \
     WHERE TagTypes.Type = ? AND Tags.Tag = ?";

const NOT_EXISTS_CLAUSE: &str = "NOT EXISTS (SELECT 1 FROM MediaTags \
     INNER JOIN Tags ON Tags.DBID = MediaTags.TagDBID \
     INNER JOIN TagTypes ON TagTypes.DBID = Tags.TypeDBID \
     WHERE MediaTags.MediaDBID = Media.DBID \
     AND TagTypes.Type = ? AND Tags.Tag = ?)";

const OR_PREDICATE: &str = "(TagTypes.Type = ? AND Tags.Tag = ?)";

/// Compile filters into WHERE-clause fragments and their positional args.
///
/// Clauses are meant to be joined with AND by the caller. Arg order matches
/// clause order: AND group first, then NOTs in input order, then the OR
/// group; each filter contributes exactly two args (type, value).
pub fn compile(filters: &[TagFilter]) -> (Vec<String>, Vec<String>) {
    let mut clauses = Vec::new();
    let mut args = Vec::new();

    let ands: Vec<&TagFilter> = filters.iter().filter(|f| f.op == TagOp::And).collect();
    let nots: Vec<&TagFilter> = filters.iter().filter(|f| f.op == TagOp::Not).collect();
    let ors: Vec<&TagFilter> = filters.iter().filter(|f| f.op == TagOp::Or).collect();

    if !ands.is_empty() {
        let subqueries = vec![AND_SUBQUERY; ands.len()].join(" INTERSECT ");
        clauses.push(format!("Media.DBID IN ({})", subqueries));
        for f in &ands {
            args.push(f.tag_type.clone());
            args.push(f.value.clone());
        }
    }

    for f in &nots {
        clauses.push(NOT_EXISTS_CLAUSE.to_string());
        args.push(f.tag_type.clone());
        args.push(f.value.clone());
    }

    if !ors.is_empty() {
        let predicates = vec![OR_PREDICATE; ors.len()].join(" OR ");
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM MediaTags \
             INNER JOIN Tags ON Tags.DBID = MediaTags.TagDBID \
             INNER JOIN TagTypes ON TagTypes.DBID = Tags.TypeDBID \
             WHERE MediaTags.MediaDBID = Media.DBID AND ({}))",
            predicates
        ));
        for f in &ors {
            args.push(f.tag_type.clone());
            args.push(f.value.clone());
        }
    }

    (clauses, args)
}
