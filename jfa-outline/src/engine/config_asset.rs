//! Outline configuration loaded from a `*.outline.json` asset and re-applied
//! to the cameras whenever the file changes.

use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;

use crate::engine::settings::{
    OutlineConfig, OutlineDefaults, OutlineDisabled, OutlinePrograms, OutlineSettings, OutlineStage,
};

pub struct OutlineConfigAssetPlugin {
    pub path: String,
}

impl Plugin for OutlineConfigAssetPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(JsonAssetPlugin::<OutlineConfig>::new(&["outline.json"]))
            .insert_resource(OutlineConfigLoader {
                path: self.path.clone(),
                handle: None,
            })
            .add_systems(Startup, load_outline_config)
            .add_systems(Update, apply_outline_config);
    }
}

#[derive(Resource, Debug)]
pub struct OutlineConfigLoader {
    pub path: String,
    pub handle: Option<Handle<OutlineConfig>>,
}

fn load_outline_config(mut loader: ResMut<OutlineConfigLoader>, asset_server: Res<AssetServer>) {
    info!("Loading outline config from: {}", loader.path);
    loader.handle = Some(asset_server.load(loader.path.clone()));
}

/// Validates the loaded config and hands the result to every 3D camera. A
/// config that fails validation disables the outline on those cameras until
/// a valid one arrives.
pub fn apply_outline_config(
    mut commands: Commands,
    mut events: EventReader<AssetEvent<OutlineConfig>>,
    loader: Res<OutlineConfigLoader>,
    configs: Res<Assets<OutlineConfig>>,
    programs: Option<Res<OutlinePrograms>>,
    stage: Option<Res<OutlineStage>>,
    defaults: Option<ResMut<OutlineDefaults>>,
    cameras: Query<Entity, With<Camera3d>>,
) {
    let Some(handle) = &loader.handle else {
        return;
    };
    let changed = events.read().any(|event| match event {
        AssetEvent::Added { id } | AssetEvent::Modified { id } => *id == handle.id(),
        _ => false,
    });
    if !changed {
        return;
    }
    let Some(config) = configs.get(handle) else {
        return;
    };

    // Pipelines are built once at startup; without them there is nothing to update.
    let Some(programs) = programs else {
        warn!("Outline config changed but the outline is disabled; restart to enable it");
        return;
    };

    match config.validate() {
        Ok(settings) => {
            if config.programs().is_ok_and(|loaded| loaded != *programs) {
                warn!("Outline shader paths changed; they take effect after a restart");
            }
            if stage.is_some_and(|stage| config.render_stage != *stage) {
                warn!("Outline render stage changed; it takes effect after a restart");
            }
            if let Some(mut defaults) = defaults {
                defaults.0 = settings;
            }
            for camera in &cameras {
                commands.entity(camera).remove::<OutlineDisabled>().insert(settings);
            }
            info!(
                "Outline config applied: layers {:#034b}, width {}px",
                settings.layer_mask.0, settings.width_px
            );
        }
        Err(err) => {
            error!("Outline config rejected, outline disabled: {}", err);
            for camera in &cameras {
                commands
                    .entity(camera)
                    .remove::<OutlineSettings>()
                    .insert(OutlineDisabled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::seed::LayerMask;

    fn outlined() -> OutlineConfig {
        OutlineConfig {
            layer_mask: LayerMask::layer(1),
            outline_width_px: 6.0,
            ..default()
        }
    }

    /// App running only the reload system, with the config asset already stored.
    fn reload_app(config: OutlineConfig) -> (App, Handle<OutlineConfig>, Entity) {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<Assets<OutlineConfig>>()
            .add_event::<AssetEvent<OutlineConfig>>()
            .insert_resource(OutlinePrograms::default())
            .add_systems(Update, apply_outline_config);

        let handle = app.world_mut().resource_mut::<Assets<OutlineConfig>>().add(config);
        app.insert_resource(OutlineConfigLoader {
            path: "test.outline.json".into(),
            handle: Some(handle.clone()),
        });
        let camera = app.world_mut().spawn(Camera3d::default()).id();
        (app, handle, camera)
    }

    fn send(app: &mut App, event: AssetEvent<OutlineConfig>) {
        app.world_mut().send_event(event);
        app.update();
    }

    #[test]
    fn empty_mask_on_load_disables_the_camera() {
        let (mut app, handle, camera) = reload_app(OutlineConfig::default());
        send(&mut app, AssetEvent::Added { id: handle.id() });

        let entity = app.world().entity(camera);
        assert!(entity.contains::<OutlineDisabled>());
        assert!(!entity.contains::<OutlineSettings>());
    }

    #[test]
    fn valid_modification_re_enables_the_camera() {
        let (mut app, handle, camera) = reload_app(OutlineConfig::default());
        app.insert_resource(OutlineDefaults(outlined().validate().unwrap()));
        send(&mut app, AssetEvent::Added { id: handle.id() });
        assert!(app.world().entity(camera).contains::<OutlineDisabled>());

        let updated = OutlineConfig {
            outline_width_px: 3.0,
            ..outlined()
        };
        *app.world_mut()
            .resource_mut::<Assets<OutlineConfig>>()
            .get_mut(&handle)
            .unwrap() = updated.clone();
        send(&mut app, AssetEvent::Modified { id: handle.id() });

        let expected = updated.validate().unwrap();
        let entity = app.world().entity(camera);
        assert!(!entity.contains::<OutlineDisabled>());
        assert_eq!(entity.get::<OutlineSettings>(), Some(&expected));
        assert_eq!(app.world().resource::<OutlineDefaults>().0, expected);
    }

    #[test]
    fn invalid_modification_replaces_existing_settings() {
        let (mut app, handle, camera) = reload_app(outlined());
        send(&mut app, AssetEvent::Added { id: handle.id() });
        assert_eq!(
            app.world().entity(camera).get::<OutlineSettings>().map(|s| s.width_px),
            Some(6.0)
        );

        app.world_mut()
            .resource_mut::<Assets<OutlineConfig>>()
            .get_mut(&handle)
            .unwrap()
            .layer_mask = LayerMask::NONE;
        send(&mut app, AssetEvent::Modified { id: handle.id() });

        let entity = app.world().entity(camera);
        assert!(entity.contains::<OutlineDisabled>());
        assert!(!entity.contains::<OutlineSettings>());
    }

    #[test]
    fn stage_change_applies_settings_but_keeps_the_startup_stage() {
        let (mut app, handle, camera) = reload_app(OutlineConfig {
            render_stage: OutlineStage::BeforePostProcessing,
            ..outlined()
        });
        app.insert_resource(OutlineStage::AfterPostProcessing);
        send(&mut app, AssetEvent::Added { id: handle.id() });

        assert!(app.world().entity(camera).contains::<OutlineSettings>());
        assert_eq!(*app.world().resource::<OutlineStage>(), OutlineStage::AfterPostProcessing);
    }

    #[test]
    fn events_for_other_assets_are_ignored() {
        let (mut app, _handle, camera) = reload_app(outlined());
        let other = app
            .world_mut()
            .resource_mut::<Assets<OutlineConfig>>()
            .add(OutlineConfig::default());
        send(&mut app, AssetEvent::Added { id: other.id() });

        let entity = app.world().entity(camera);
        assert!(!entity.contains::<OutlineSettings>());
        assert!(!entity.contains::<OutlineDisabled>());
    }

    #[test]
    fn nothing_changes_when_the_outline_never_started() {
        let (mut app, handle, camera) = reload_app(outlined());
        app.world_mut().remove_resource::<OutlinePrograms>();
        send(&mut app, AssetEvent::Added { id: handle.id() });

        assert!(!app.world().entity(camera).contains::<OutlineSettings>());
    }
}
