//! Statistical check of random selection uniformity.

use std::collections::HashMap;

use mediadex::db::queries::random;
use mediadex::{MediaDb, MediaType};

#[test]
fn random_draws_are_roughly_uniform() {
    let db = MediaDb::open_in_memory().unwrap();

    // Densely packed DBIDs: every sampled target is an exact hit, so the
    // draw distribution mirrors the target distribution.
    let rows = 20usize;
    let tx = db.begin_index().unwrap();
    let nes = tx.upsert_system("NES", "Nintendo").unwrap();
    let title = tx
        .upsert_media_title(nes, MediaType::Game, "Mega Man")
        .unwrap();
    for i in 0..rows {
        tx.add_media(title, nes, &format!("/roms/nes/mm-{i:02}.nes"))
            .unwrap();
    }
    tx.commit().unwrap();

    let conn = db.conn().unwrap();
    let draws = rows * 20;
    let mut frequency: HashMap<i64, usize> = HashMap::new();
    for _ in 0..draws {
        let pick = random::random_media(&conn, &["NES".to_string()])
            .unwrap()
            .unwrap();
        *frequency.entry(pick.media_dbid).or_default() += 1;
    }

    // Every row is reachable.
    assert_eq!(frequency.len(), rows);

    // Loose binomial bounds: expected 20 draws per row; a uniform draw
    // stays far inside [2, 60] at this sample size.
    for (dbid, count) in &frequency {
        assert!(
            (2..=60).contains(count),
            "row {dbid} drawn {count} times out of {draws}"
        );
    }

    db.close().unwrap();
}
