//! 1フレーム分のスケルトンシーン組み立て。
//!
//! Poseと固定トポロジから描画プリミティブ一式 (SceneFrame) を生成する。
//! 出力は入力の純粋関数で、フレームを跨ぐ状態を一切持たない。

use crate::pose::Pose;

use super::topology::{classify, JointClass, CONNECTIONS};
use super::transform::to_scene;

/// シーン構築パラメータ
#[derive(Debug, Clone, Copy)]
pub struct OverlayParams {
    /// マーカー描画の信頼度閾値。これを厳密に上回る点のみ描画する。
    pub point_threshold: f32,
    /// セグメント描画の信頼度閾値。両端がこれを厳密に上回る場合のみ描画する。
    pub connection_threshold: f32,
    /// 座標スケール
    pub scale: f32,
    /// 奥行きオフセット
    pub z_offset: f32,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            point_threshold: 0.2,
            connection_threshold: 0.5,
            scale: 5.0,
            z_offset: -5.0,
        }
    }
}

/// 関節マーカー (球)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointMarker {
    pub index: usize,
    pub position: [f32; 3],
    pub class: JointClass,
}

/// 骨格セグメント (2関節間のチューブ)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimbSegment {
    pub connection: (usize, usize),
    pub start: [f32; 3],
    pub end: [f32; 3],
}

/// 1フレーム分の描画プリミティブ一式
///
/// フレーム毎に作り直され、前フレームの内容は一切引き継がない。
#[derive(Debug, Clone, Default)]
pub struct SceneFrame {
    pub markers: Vec<JointMarker>,
    pub segments: Vec<LimbSegment>,
}

/// Poseと固定トポロジから1フレーム分のシーンを組み立てる
///
/// 1. キーポイントをインデックス順に変換・分類してマーカーを生成し、
///    接続パス用に (位置, スコア) をインデックス整合のまま記録する。
/// 2. トポロジ順に接続を走査し、両端の記録が存在しスコアが接続閾値を
///    厳密に上回る場合のみセグメントを生成する。
///
/// 点閾値を下回るキーポイントは記録スロットを None にするだけで、後続の
/// インデックスは詰めない。詰めると固定トポロジテーブルの参照先が別の
/// 関節にずれてしまう。キーポイントの欠損や範囲外の接続参照は該当
/// セグメントが省かれるだけで、エラーにはならない。
pub fn build_frame(pose: &Pose, params: &OverlayParams) -> SceneFrame {
    let mut markers = Vec::with_capacity(pose.len());
    let mut records: Vec<Option<([f32; 3], f32)>> = vec![None; pose.len()];

    for (index, kp) in pose.keypoints.iter().enumerate() {
        if !kp.passes(params.point_threshold) {
            continue;
        }
        let position = to_scene(kp.x, kp.y, kp.z, params.scale, params.z_offset);
        markers.push(JointMarker {
            index,
            position,
            class: classify(index),
        });
        records[index] = Some((position, kp.score));
    }

    let mut segments = Vec::new();
    for &(a, b) in CONNECTIONS.iter() {
        let start = records.get(a).copied().flatten();
        let end = records.get(b).copied().flatten();
        if let (Some((start, start_score)), Some((end, end_score))) = (start, end) {
            if start_score > params.connection_threshold && end_score > params.connection_threshold {
                segments.push(LimbSegment {
                    connection: (a, b),
                    start,
                    end,
                });
            }
        }
    }

    SceneFrame { markers, segments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;
    use crate::pose::KEYPOINT_COUNT;

    /// 全キーポイントが同一スコアのPoseを作る
    fn uniform_pose(count: usize, score: f32) -> Pose {
        let keypoints = (0..count)
            .map(|i| Keypoint::new(i as f32 * 0.1, i as f32 * 0.2, 0.0, score))
            .collect();
        Pose::new(keypoints)
    }

    #[test]
    fn test_full_pose_marker_and_segment_counts() {
        let pose = uniform_pose(KEYPOINT_COUNT, 0.9);
        let frame = build_frame(&pose, &OverlayParams::default());
        assert_eq!(frame.markers.len(), KEYPOINT_COUNT);
        assert_eq!(frame.segments.len(), CONNECTIONS.len());
    }

    #[test]
    fn test_deterministic() {
        let pose = uniform_pose(KEYPOINT_COUNT, 0.8);
        let params = OverlayParams::default();
        let a = build_frame(&pose, &params);
        let b = build_frame(&pose, &params);
        assert_eq!(a.markers, b.markers);
        assert_eq!(a.segments, b.segments);
    }

    #[test]
    fn test_marker_position_is_transformed() {
        let pose = Pose::new(vec![Keypoint::new(1.0, 2.0, 0.5, 0.9)]);
        let frame = build_frame(&pose, &OverlayParams::default());
        assert_eq!(frame.markers.len(), 1);
        assert_eq!(frame.markers[0].position, [5.0, -10.0, -2.5]);
        assert_eq!(frame.markers[0].class, JointClass::Root);
    }

    #[test]
    fn test_connection_threshold_boundary_is_strict() {
        // 接続 (0, 1): スコアが閾値ちょうどなら除外、僅かに上なら採用
        let at_threshold = uniform_pose(2, 0.5);
        let frame = build_frame(&at_threshold, &OverlayParams::default());
        assert_eq!(frame.segments.len(), 0);

        let above = uniform_pose(2, 0.51);
        let frame = build_frame(&above, &OverlayParams::default());
        assert_eq!(frame.segments.len(), 1);
        assert_eq!(frame.segments[0].connection, (0, 1));
    }

    #[test]
    fn test_one_weak_endpoint_omits_segment() {
        let mut pose = uniform_pose(2, 0.9);
        pose.keypoints[1].score = 0.5;
        let frame = build_frame(&pose, &OverlayParams::default());
        // 片端のマーカーは残るがセグメントは描かれない
        assert_eq!(frame.markers.len(), 2);
        assert_eq!(frame.segments.len(), 0);
    }

    #[test]
    fn test_point_threshold_filters_marker_and_connection() {
        let mut pose = uniform_pose(2, 0.9);
        pose.keypoints[0].score = 0.2; // 点閾値ちょうど → 除外 (厳密比較)
        let frame = build_frame(&pose, &OverlayParams::default());
        assert_eq!(frame.markers.len(), 1);
        assert_eq!(frame.markers[0].index, 1);
        // 除外された端点に触れる接続は存在しない扱い
        assert_eq!(frame.segments.len(), 0);
    }

    #[test]
    fn test_point_threshold_preserves_index_alignment() {
        // インデックス1を除外しても2以降のインデックスはずれない
        let mut pose = uniform_pose(4, 0.9);
        pose.keypoints[1].score = 0.0;
        let frame = build_frame(&pose, &OverlayParams::default());
        let indices: Vec<usize> = frame.markers.iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![0, 2, 3]);
        // (0,1) と (1,2) は消え、(2,3) だけが残る
        let connections: Vec<(usize, usize)> =
            frame.segments.iter().map(|s| s.connection).collect();
        assert_eq!(connections, vec![(2, 3)]);
    }

    #[test]
    fn test_partial_pose_degrades_gracefully() {
        let pose = uniform_pose(10, 0.9);
        let frame = build_frame(&pose, &OverlayParams::default());
        assert_eq!(frame.markers.len(), 10);
        // 両端がインデックス10未満の接続のみ残る
        let expected: Vec<(usize, usize)> = CONNECTIONS
            .iter()
            .copied()
            .filter(|&(a, b)| a < 10 && b < 10)
            .collect();
        let actual: Vec<(usize, usize)> = frame.segments.iter().map(|s| s.connection).collect();
        assert_eq!(actual, expected);
        for segment in &frame.segments {
            assert!(segment.connection.0 < 10);
            assert!(segment.connection.1 < 10);
        }
    }

    #[test]
    fn test_empty_pose() {
        let frame = build_frame(&Pose::default(), &OverlayParams::default());
        assert!(frame.markers.is_empty());
        assert!(frame.segments.is_empty());
    }

    #[test]
    fn test_frame_isolation() {
        // フレームNの後にフレームN+1を組み立てても前フレームの内容は残らない
        let params = OverlayParams::default();
        let _ = build_frame(&uniform_pose(KEYPOINT_COUNT, 0.9), &params);
        let next = build_frame(&uniform_pose(10, 0.9), &params);
        assert_eq!(next.markers.len(), 10);
        assert!(next.markers.iter().all(|m| m.index < 10));
        assert!(next
            .segments
            .iter()
            .all(|s| s.connection.0 < 10 && s.connection.1 < 10));
    }
}
