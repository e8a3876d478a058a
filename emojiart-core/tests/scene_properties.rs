//! Property tests for the scene model.
//!
//! Covers the encode/decode round trip, id uniqueness across arbitrary edit
//! sequences, and size positivity under scaling.

use std::collections::HashSet;

use emojiart_core::{Background, Scene, StickerId, UndoLog};
use proptest::prelude::*;

/// A single scene edit.
#[derive(Debug, Clone)]
enum Edit {
    Add { glyph: String, x: i32, y: i32, size: u32 },
    Move { pick: usize, dx: i32, dy: i32 },
    Scale { pick: usize, factor: f64 },
    Remove { pick: usize },
    Background(Background),
}

fn glyph() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["🙂", "🐢", "👮‍♂️", "🇳🇿", "x"]).prop_map(str::to_string)
}

fn background() -> impl Strategy<Value = Background> {
    prop_oneof![
        Just(Background::Blank),
        "[a-z]{1,8}".prop_map(|path| {
            Background::RemoteUrl(
                url::Url::parse(&format!("https://example.com/{path}.png")).expect("url"),
            )
        }),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Background::InlineBytes),
    ]
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (glyph(), any::<i32>(), any::<i32>(), 0u32..500)
            .prop_map(|(glyph, x, y, size)| Edit::Add { glyph, x, y, size }),
        (any::<usize>(), -1000i32..1000, -1000i32..1000)
            .prop_map(|(pick, dx, dy)| Edit::Move { pick, dx, dy }),
        (any::<usize>(), -4.0f64..4.0).prop_map(|(pick, factor)| Edit::Scale { pick, factor }),
        any::<usize>().prop_map(|pick| Edit::Remove { pick }),
        background().prop_map(Edit::Background),
    ]
}

/// Pick an existing sticker id, or an unknown one for empty scenes.
fn pick_id(scene: &Scene, pick: usize) -> StickerId {
    scene
        .stickers()
        .get(pick % scene.len().max(1))
        .map_or(StickerId::new(u64::MAX), |s| s.id)
}

fn apply(scene: &mut Scene, edit: &Edit) {
    match edit {
        Edit::Add { glyph, x, y, size } => {
            scene.add_sticker(glyph.clone(), (*x, *y), *size);
        }
        Edit::Move { pick, dx, dy } => {
            let id = pick_id(scene, *pick);
            scene.move_sticker(id, *dx, *dy);
        }
        Edit::Scale { pick, factor } => {
            let id = pick_id(scene, *pick);
            scene.scale_sticker(id, *factor);
        }
        Edit::Remove { pick } => {
            let id = pick_id(scene, *pick);
            scene.remove_sticker(id);
        }
        Edit::Background(background) => scene.set_background(background.clone()),
    }
}

fn assert_unique_ids(scene: &Scene) {
    let mut seen = HashSet::new();
    for sticker in scene.stickers() {
        assert!(seen.insert(sticker.id), "duplicate id {}", sticker.id);
        assert!(sticker.id <= scene.last_sticker_id());
        assert!(sticker.size >= 1);
    }
}

proptest! {
    #[test]
    fn prop_round_trip(edits in prop::collection::vec(edit(), 0..40)) {
        let mut scene = Scene::new();
        for edit in &edits {
            apply(&mut scene, edit);
        }
        let decoded = Scene::decode(&scene.encode().expect("encode")).expect("decode");
        prop_assert_eq!(decoded, scene);
    }

    #[test]
    fn prop_ids_unique_and_never_reused(edits in prop::collection::vec(edit(), 0..60)) {
        let mut scene = Scene::new();
        let mut issued = HashSet::new();
        for edit in &edits {
            let before = scene.last_sticker_id();
            apply(&mut scene, edit);
            if scene.last_sticker_id() != before {
                let newest = scene.stickers().last().expect("just added").id;
                prop_assert!(issued.insert(newest), "id {} reused", newest);
            }
            assert_unique_ids(&scene);
        }
    }

    #[test]
    fn prop_ids_unique_through_undo_redo(
        edits in prop::collection::vec(edit(), 0..30),
        steps in prop::collection::vec(any::<bool>(), 0..30),
    ) {
        let mut scene = Scene::new();
        let mut log = UndoLog::new();
        for edit in &edits {
            log.record("edit", scene.clone());
            apply(&mut scene, edit);
        }
        for undo in steps {
            let restored = if undo { log.undo(scene.clone()) } else { log.redo(scene.clone()) };
            if let Some((_, mut restored)) = restored {
                restored.reserve_ids_through(scene.last_sticker_id());
                scene = restored;
            }
            assert_unique_ids(&scene);
        }
        let id = scene.add_sticker("🙂", (0, 0), 1);
        prop_assert!(scene.stickers().iter().filter(|s| s.id == id).count() == 1);
    }

    #[test]
    fn prop_scale_stays_positive(size in 1u32..100_000, factor in prop::num::f64::ANY) {
        prop_assume!(factor != 0.0);
        let mut scene = Scene::new();
        let id = scene.add_sticker("🙂", (0, 0), size);
        scene.scale_sticker(id, factor);
        prop_assert!(scene.sticker(id).expect("exists").size >= 1);
    }
}
