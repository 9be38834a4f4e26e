//! Shared helpers for integration tests.
#![allow(dead_code)]

use mediadex::common::{MapSystemDefs, MediaType};
use mediadex::MediaDb;

/// System definitions matching the seeded catalog.
pub fn defs() -> MapSystemDefs {
    [
        ("NES", MediaType::Game),
        ("SNES", MediaType::Game),
        ("TVShows", MediaType::TvShow),
    ]
    .into_iter()
    .collect()
}

/// Index a small catalog: two game systems plus a TV system, with tags.
pub fn seed_catalog(db: &MediaDb) {
    let tx = db.begin_index().unwrap();

    let nes = tx.upsert_system("NES", "Nintendo Entertainment System").unwrap();
    let snes = tx.upsert_system("SNES", "Super Nintendo").unwrap();
    let tv = tx.upsert_system("TVShows", "TV Shows").unwrap();

    let zelda = tx
        .upsert_media_title(nes, MediaType::Game, "The Legend of Zelda")
        .unwrap();
    let zelda2 = tx
        .upsert_media_title(nes, MediaType::Game, "Zelda II: The Adventure of Link")
        .unwrap();
    let mario = tx
        .upsert_media_title(nes, MediaType::Game, "Super Mario Bros.")
        .unwrap();
    let metroid = tx
        .upsert_media_title(snes, MediaType::Game, "Super Metroid")
        .unwrap();
    let ff7 = tx
        .upsert_media_title(snes, MediaType::Game, "Final Fantasy VII")
        .unwrap();
    let bb = tx
        .upsert_media_title(tv, MediaType::TvShow, "Breaking Bad 1x02")
        .unwrap();

    let zelda_usa = tx.add_media(zelda, nes, "/roms/nes/zelda-usa.nes").unwrap();
    let zelda_eur = tx.add_media(zelda, nes, "/roms/nes/zelda-eur.nes").unwrap();
    let zelda2_usa = tx.add_media(zelda2, nes, "/roms/nes/zelda2.nes").unwrap();
    let mario_usa = tx.add_media(mario, nes, "/roms/nes/mario.nes").unwrap();
    let metroid_usa = tx
        .add_media(metroid, snes, "/roms/snes/metroid.sfc")
        .unwrap();
    let ff7_jp = tx.add_media(ff7, snes, "/roms/snes/ff7.sfc").unwrap();
    let bb_ep = tx.add_media(bb, tv, "/tv/breaking-bad/s01e02.mkv").unwrap();

    let usa = tx.upsert_tag("region", "usa").unwrap();
    let eur = tx.upsert_tag("region", "europe").unwrap();
    let japan = tx.upsert_tag("region", "japan").unwrap();
    let action = tx.upsert_tag("genre", "action").unwrap();
    let rpg = tx.upsert_tag("genre", "rpg").unwrap();
    let y1994 = tx.upsert_tag("year", "1994").unwrap();

    tx.tag_media(zelda_usa, usa).unwrap();
    tx.tag_media(zelda_usa, action).unwrap();
    tx.tag_media(zelda_eur, eur).unwrap();
    tx.tag_media(zelda2_usa, usa).unwrap();
    tx.tag_media(mario_usa, usa).unwrap();
    tx.tag_media(metroid_usa, usa).unwrap();
    tx.tag_media(metroid_usa, action).unwrap();
    tx.tag_media(metroid_usa, y1994).unwrap();
    tx.tag_media(ff7_jp, japan).unwrap();
    tx.tag_media(ff7_jp, rpg).unwrap();
    tx.tag_media(bb_ep, usa).unwrap();

    tx.commit().unwrap();
}
