//! bevyによるオーバーレイ描画層。
//!
//! SceneFrameをエンティティ (球・円柱) に変換する。メッシュとマテリアルは
//! 起動時に一度だけ生成してフレーム間で共有し、フレーム毎に増減するのは
//! エンティティだけにする。

use bevy::prelude::*;

use crate::scene::builder::SceneFrame;
use crate::scene::topology::{class_color, JointClass, LIMB_COLOR};

/// シーンカメラの視野角 (度)
pub const CAMERA_FOV_DEG: f32 = 75.0;
/// シーンカメラのニアクリップ
pub const CAMERA_NEAR: f32 = 0.1;
/// シーンカメラのファークリップ
pub const CAMERA_FAR: f32 = 1000.0;
/// シーンカメラの視点位置 (Z)。-Z方向を向く。
pub const CAMERA_EYE_Z: f32 = 2.0;

/// 現フレームのオーバーレイ描画物に付けるマーカーコンポーネント。
/// フレーム再構築時はこれを持つ全エンティティを破棄する。
#[derive(Component)]
pub struct OverlayPrimitive;

/// フレーム間で共有するメッシュとマテリアル
#[derive(Resource)]
pub struct OverlayAssets {
    sphere: Handle<Mesh>,
    tube: Handle<Mesh>,
    root: Handle<StandardMaterial>,
    peripheral: Handle<StandardMaterial>,
    torso: Handle<StandardMaterial>,
    limb: Handle<StandardMaterial>,
}

impl OverlayAssets {
    /// 起動時に一度だけ生成する
    pub fn create(
        meshes: &mut Assets<Mesh>,
        materials: &mut Assets<StandardMaterial>,
        sphere_radius: f32,
        tube_radius: f32,
    ) -> Self {
        let mut unlit = |rgb: u32| {
            materials.add(StandardMaterial {
                base_color: color_from_rgb(rgb),
                unlit: true,
                ..default()
            })
        };
        let root = unlit(class_color(JointClass::Root));
        let peripheral = unlit(class_color(JointClass::Peripheral));
        let torso = unlit(class_color(JointClass::Torso));
        let limb = unlit(LIMB_COLOR);

        Self {
            sphere: meshes.add(Sphere::new(sphere_radius)),
            // 単位長の円柱。セグメント毎にY方向へスケールして使う。
            tube: meshes.add(Cylinder::new(tube_radius, 1.0)),
            root,
            peripheral,
            torso,
            limb,
        }
    }

    fn material_for(&self, class: JointClass) -> Handle<StandardMaterial> {
        match class {
            JointClass::Root => self.root.clone(),
            JointClass::Peripheral => self.peripheral.clone(),
            JointClass::Torso => self.torso.clone(),
        }
    }
}

/// 0xRRGGBB を bevy の Color へ
fn color_from_rgb(rgb: u32) -> Color {
    Color::srgb_u8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

/// 固定パラメータのシーンカメラを生成する
pub fn spawn_scene_camera(commands: &mut Commands) {
    commands.spawn(Camera3dBundle {
        projection: PerspectiveProjection {
            fov: CAMERA_FOV_DEG.to_radians(),
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            ..default()
        }
        .into(),
        transform: Transform::from_xyz(0.0, 0.0, CAMERA_EYE_Z),
        ..default()
    });
}

/// SceneFrameの全プリミティブをエンティティとして生成する。
/// 前フレーム分の破棄は呼び出し側の責務。
pub fn spawn_frame(commands: &mut Commands, assets: &OverlayAssets, frame: &SceneFrame) {
    for marker in &frame.markers {
        commands.spawn((
            PbrBundle {
                mesh: assets.sphere.clone(),
                material: assets.material_for(marker.class),
                transform: Transform::from_translation(Vec3::from_array(marker.position)),
                ..default()
            },
            OverlayPrimitive,
        ));
    }
    for segment in &frame.segments {
        commands.spawn((
            PbrBundle {
                mesh: assets.tube.clone(),
                material: assets.limb.clone(),
                transform: segment_transform(segment.start, segment.end),
                ..default()
            },
            OverlayPrimitive,
        ));
    }
}

/// 単位円柱を start-end 間のセグメントに重ねる変換
///
/// 中点へ平行移動し、+Y軸をセグメント方向へ回転させ、Y方向に長さ分
/// スケールする。
pub fn segment_transform(start: [f32; 3], end: [f32; 3]) -> Transform {
    let start = Vec3::from_array(start);
    let end = Vec3::from_array(end);
    let delta = end - start;
    let length = delta.length();
    let rotation = if length > f32::EPSILON {
        Quat::from_rotation_arc(Vec3::Y, delta / length)
    } else {
        Quat::IDENTITY
    };

    Transform {
        translation: (start + end) * 0.5,
        rotation,
        scale: Vec3::new(1.0, length.max(f32::EPSILON), 1.0),
    }
}
