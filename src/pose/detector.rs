use anyhow::{Context, Result};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::keypoint::{Keypoint, Pose, KEYPOINT_COUNT};

/// ポーズ有無の判定閾値。存在スコアがこれを下回るフレームは非検出扱い。
const PRESENCE_THRESHOLD: f32 = 0.5;

/// スクリーンランドマーク1点あたりの要素数 (x, y, z, visibility, presence)
const SCREEN_STRIDE: usize = 5;

/// ワールドランドマーク1点あたりの要素数 (x, y, z)
const WORLD_STRIDE: usize = 3;

/// BlazePose を使用した姿勢推定器
///
/// モデルは起動時に一度読み込み、以後差し替えない。平滑化はモデル側の
/// 責務で、このクレートはフレーム毎の出力をそのまま消費する。
pub struct PoseDetector {
    session: Session,
}

impl PoseDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path.as_ref())
            .context("Failed to load ONNX model")?;

        Ok(Self { session })
    }

    /// 前処理済みテンソルから姿勢を推定する
    ///
    /// 入力: [1, 256, 256, 3] の f32 テンソル
    /// 出力: 検出されたPoseのリスト (非検出時は空)
    ///
    /// 出力名・形状が想定と違うモデルはErrで返す。推論スレッド側が
    /// ログして空結果として扱えるよう、ここでpanicしてはならない。
    pub fn detect(&mut self, input: Array4<f32>) -> Result<Vec<Pose>> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["input_1" => input_tensor])
            .context("Inference failed")?;

        // ポーズ存在スコア [1, 1]
        let presence: ndarray::ArrayViewD<f32> = outputs
            .get("Identity_1")
            .context("Model output 'Identity_1' (presence) missing")?
            .try_extract_array()
            .context("Failed to extract presence tensor")?;
        let presence = *presence
            .iter()
            .next()
            .context("Presence tensor is empty")?;
        if presence < PRESENCE_THRESHOLD {
            return Ok(Vec::new());
        }

        // スクリーンランドマーク [1, 195] = 39点 x (x, y, z, visibility, presence)
        // visibility だけをスコア算出に使う
        let screen: ndarray::ArrayViewD<f32> = outputs
            .get("Identity")
            .context("Model output 'Identity' (landmarks) missing")?
            .try_extract_array()
            .context("Failed to extract landmark tensor")?;
        let screen = screen
            .as_slice()
            .context("Landmark tensor is not contiguous")?;

        // ワールドランドマーク [1, 117] = 39点 x (x, y, z)  腰中心・メートル単位
        let world: ndarray::ArrayViewD<f32> = outputs
            .get("Identity_4")
            .context("Model output 'Identity_4' (world landmarks) missing")?
            .try_extract_array()
            .context("Failed to extract world landmark tensor")?;
        let world = world
            .as_slice()
            .context("World landmark tensor is not contiguous")?;

        // BlazePoseは単一人物モデルなので高々1件
        Ok(vec![pose_from_landmarks(world, screen)])
    }
}

/// ワールド座標とvisibilityロジットからPoseを組み立てる
///
/// 点数はテンソル長から決まり、期待より短い出力は部分的なPoseになる
/// だけでエラーにはしない。
fn pose_from_landmarks(world: &[f32], screen: &[f32]) -> Pose {
    let count = KEYPOINT_COUNT
        .min(world.len() / WORLD_STRIDE)
        .min(screen.len() / SCREEN_STRIDE);

    let mut keypoints = Vec::with_capacity(count);
    for i in 0..count {
        let x = world[i * WORLD_STRIDE];
        let y = world[i * WORLD_STRIDE + 1];
        let z = world[i * WORLD_STRIDE + 2];
        let score = sigmoid(screen[i * SCREEN_STRIDE + 3]);
        keypoints.push(Keypoint::new(x, y, z, score));
    }
    Pose::new(keypoints)
}

/// visibility ロジットを 0.0-1.0 のスコアへ
fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// n点分のワールド/スクリーンテンソルを作る
    fn landmark_buffers(n: usize, visibility_logit: f32) -> (Vec<f32>, Vec<f32>) {
        let mut world = Vec::with_capacity(n * WORLD_STRIDE);
        let mut screen = Vec::with_capacity(n * SCREEN_STRIDE);
        for i in 0..n {
            let base = i as f32;
            world.extend([base, base + 0.1, base + 0.2]);
            screen.extend([0.0, 0.0, 0.0, visibility_logit, 1.0]);
        }
        (world, screen)
    }

    #[test]
    fn test_pose_from_landmarks_truncates_to_keypoint_count() {
        let (world, screen) = landmark_buffers(39, 3.0);
        let pose = pose_from_landmarks(&world, &screen);
        assert_eq!(pose.len(), KEYPOINT_COUNT);
        assert_eq!(pose.keypoints[1].x, 1.0);
        assert!((pose.keypoints[1].y - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_pose_from_landmarks_short_output() {
        // 期待より短い出力 → 部分的なPose、panicしない
        let (world, screen) = landmark_buffers(10, 0.0);
        let pose = pose_from_landmarks(&world, &screen);
        assert_eq!(pose.len(), 10);
    }

    #[test]
    fn test_pose_from_landmarks_mismatched_lengths() {
        // ワールド側だけ短い場合は短い方に合わせる
        let (world, _) = landmark_buffers(5, 0.0);
        let (_, screen) = landmark_buffers(39, 0.0);
        let pose = pose_from_landmarks(&world, &screen);
        assert_eq!(pose.len(), 5);
    }

    #[test]
    fn test_pose_from_landmarks_empty() {
        let pose = pose_from_landmarks(&[], &[]);
        assert!(pose.is_empty());
    }

    #[test]
    fn test_pose_from_landmarks_score_is_sigmoid() {
        let (world, screen) = landmark_buffers(1, 0.0);
        let pose = pose_from_landmarks(&world, &screen);
        assert!((pose.keypoints[0].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sigmoid_range() {
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
        assert!(sigmoid(2.0) > sigmoid(-2.0));
    }
}
