use std::collections::HashSet;

use bevy::prelude::*;
use bevy::render::Extract;
use bevy::render::render_phase::ViewSortedRenderPhases;
use bevy::render::view::RetainedViewEntity;

use crate::engine::render::seed_phase::SeedPhase;
use crate::engine::settings::OutlineSettings;

/// Gives every active outlined camera an empty seed phase for this frame.
pub fn extract_seed_phases(
    mut seed_phases: ResMut<ViewSortedRenderPhases<SeedPhase>>,
    cameras: Extract<Query<(Entity, &Camera), (With<Camera3d>, With<OutlineSettings>)>>,
    mut live_entities: Local<HashSet<RetainedViewEntity>>,
) {
    live_entities.clear();
    for (main_entity, camera) in &cameras {
        if !camera.is_active {
            continue;
        }

        let retained_view_entity = RetainedViewEntity::new(main_entity.into(), None, 0);
        seed_phases.insert_or_clear(retained_view_entity);
        live_entities.insert(retained_view_entity);
    }
    seed_phases.retain(|camera_entity, _| live_entities.contains(camera_entity));
}
