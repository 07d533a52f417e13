use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::scene::OverlayParams;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// ONNXモデルのパス
    #[serde(default = "default_model")]
    pub model: String,
    /// キャプチャの目標FPS。ループ自体はディスプレイのリフレッシュ駆動。
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// カメラデバイス番号
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    /// マーカー描画の信頼度閾値
    #[serde(default = "default_point_threshold")]
    pub point_threshold: f32,
    /// セグメント描画の信頼度閾値
    #[serde(default = "default_connection_threshold")]
    pub connection_threshold: f32,
    /// シーン座標スケール
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// 奥行きオフセット
    #[serde(default = "default_z_offset")]
    pub z_offset: f32,
    /// 関節マーカー球の半径
    #[serde(default = "default_sphere_radius")]
    pub sphere_radius: f32,
    /// 骨格チューブの半径
    #[serde(default = "default_tube_radius")]
    pub tube_radius: f32,
}

fn default_model() -> String {
    "models/blazepose_full.onnx".to_string()
}
fn default_target_fps() -> u32 {
    60
}
fn default_camera_width() -> u32 {
    640
}
fn default_camera_height() -> u32 {
    480
}
fn default_point_threshold() -> f32 {
    0.2
}
fn default_connection_threshold() -> f32 {
    0.5
}
fn default_scale() -> f32 {
    5.0
}
fn default_z_offset() -> f32 {
    -5.0
}
fn default_sphere_radius() -> f32 {
    0.2
}
fn default_tube_radius() -> f32 {
    0.2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            target_fps: default_target_fps(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            point_threshold: default_point_threshold(),
            connection_threshold: default_connection_threshold(),
            scale: default_scale(),
            z_offset: default_z_offset(),
            sphere_radius: default_sphere_radius(),
            tube_radius: default_tube_radius(),
        }
    }
}

impl OverlayConfig {
    /// シーンビルダー用のパラメータへ変換
    pub fn params(&self) -> OverlayParams {
        OverlayParams {
            point_threshold: self.point_threshold,
            connection_threshold: self.connection_threshold,
            scale: self.scale,
            z_offset: self.z_offset,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 読み込みに失敗したらデフォルト設定で続行する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Config load failed ({}), using defaults", e);
                Self::default()
            }
        }
    }
}
