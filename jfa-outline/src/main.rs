use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy::window::PresentMode;
use jfa_outline::engine::config_asset::OutlineConfigAssetPlugin;
use jfa_outline::engine::seed::{LayerMask, OutlineLayer};
use jfa_outline::engine::settings::{OutlineConfig, OutlineSettings};
use jfa_outline::JfaOutlinePlugin;

const OUTLINE_CONFIG_PATH: &str = "outline/default.outline.json";
const OUTLINED_LAYER: u8 = 1;
const PLAIN_LAYER: u8 = 0;

#[derive(Component)]
struct FpsText;

#[derive(Component)]
struct Spinning(f32);

fn main() {
    let mut app = create_app();

    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(async move {
            app.run();
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        app.run();
    }
}

fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        .add_plugins(JfaOutlinePlugin::new(initial_config()))
        .add_plugins(OutlineConfigAssetPlugin {
            path: OUTLINE_CONFIG_PATH.to_string(),
        })
        .add_systems(Startup, setup)
        .add_systems(Update, (spin_system, outline_controls, fps_text_update_system));

    app
}

/// The config baked in at compile time, so the outline is configured before
/// the asset server has loaded anything.
fn initial_config() -> OutlineConfig {
    let bundled = include_str!("../assets/outline/default.outline.json");
    serde_json::from_str(bundled).unwrap_or_else(|err| {
        eprintln!("Bundled outline config is invalid ({err}), using defaults");
        OutlineConfig {
            layer_mask: LayerMask::layer(OUTLINED_LAYER),
            ..default()
        }
    })
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}

fn create_window_config() -> Window {
    #[cfg(target_arch = "wasm32")]
    {
        Window {
            canvas: Some("#bevy".into()),
            fit_canvas_to_parent: true,
            prevent_default_event_handling: false,
            present_mode: PresentMode::AutoVsync,
            ..default()
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Window {
            title: "JFA outline".into(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }
    }
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    info!("1/2/3: outline width 2/4/8 px, O: toggle outlining the ground");

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(-2.5, 4.5, 9.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));

    let grey = materials.add(StandardMaterial::from(Color::srgb(0.6, 0.6, 0.6)));
    let orange = materials.add(StandardMaterial::from(Color::srgb(0.9, 0.5, 0.2)));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(12.0, 12.0))),
        MeshMaterial3d(grey.clone()),
        OutlineLayer(PLAIN_LAYER),
    ));
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(1.5, 1.5, 1.5))),
        MeshMaterial3d(orange.clone()),
        Transform::from_xyz(-1.5, 1.0, 0.0),
        OutlineLayer(OUTLINED_LAYER),
        Spinning(0.8),
    ));
    commands.spawn((
        Mesh3d(meshes.add(Torus::new(0.5, 1.0))),
        MeshMaterial3d(orange),
        Transform::from_xyz(2.0, 1.0, 0.0),
        OutlineLayer(OUTLINED_LAYER),
        Spinning(-1.2),
    ));
    // No outline layer at all: never selected.
    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(0.6))),
        MeshMaterial3d(grey),
        Transform::from_xyz(0.0, 0.6, 2.5),
    ));

    spawn_ui(&mut commands);
}

fn spawn_ui(commands: &mut Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new("FPS: "),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(1., 0., 0.)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                FpsText,
            ));
        });
}

fn spin_system(time: Res<Time>, mut query: Query<(&mut Transform, &Spinning)>) {
    for (mut transform, spinning) in &mut query {
        transform.rotate_y(spinning.0 * time.delta_secs());
        transform.rotate_x(0.5 * spinning.0 * time.delta_secs());
    }
}

fn outline_controls(keyboard: Res<ButtonInput<KeyCode>>, mut cameras: Query<&mut OutlineSettings>) {
    let width = if keyboard.just_pressed(KeyCode::Digit1) {
        Some(2.0)
    } else if keyboard.just_pressed(KeyCode::Digit2) {
        Some(4.0)
    } else if keyboard.just_pressed(KeyCode::Digit3) {
        Some(8.0)
    } else {
        None
    };
    let toggle_ground = keyboard.just_pressed(KeyCode::KeyO);

    for mut settings in &mut cameras {
        if let Some(width) = width {
            settings.width_px = width;
            info!("Outline width: {}px", width);
        }
        if toggle_ground {
            settings.layer_mask = if settings.layer_mask.contains(PLAIN_LAYER) {
                LayerMask::layer(OUTLINED_LAYER)
            } else {
                settings.layer_mask.with(PLAIN_LAYER)
            };
            info!("Outline layer mask: {:#b}", settings.layer_mask.0);
        }
    }
}

fn fps_text_update_system(
    diagnostics: Res<DiagnosticsStore>,
    mut query: Query<&mut Text, With<FpsText>>,
) {
    for mut text in &mut query {
        if let Some(fps) = diagnostics.get(&FrameTimeDiagnosticsPlugin::FPS) {
            if let Some(value) = fps.smoothed() {
                text.0 = format!("FPS: {value:.1}");
            }
        }
    }
}
