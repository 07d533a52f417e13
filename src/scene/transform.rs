//! 推定器ネイティブ座標からシーン座標への変換。

/// キーポイント座標をシーン座標へ変換する純粋関数
///
/// 画像座標系は下向きが正なのでYを反転する。Zオフセットで骨格全体を
/// シーンカメラの前方へ寄せる。
pub fn to_scene(x: f32, y: f32, z: f32, scale: f32, z_offset: f32) -> [f32; 3] {
    [x * scale, -y * scale, z * scale + z_offset]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_scene_reference_vector() {
        let out = to_scene(1.0, 2.0, 0.5, 5.0, -5.0);
        assert_eq!(out, [5.0, -10.0, -2.5]);
    }

    #[test]
    fn test_to_scene_inverts_y() {
        let out = to_scene(0.0, 1.0, 0.0, 2.0, 0.0);
        assert_eq!(out[1], -2.0);
        let out = to_scene(0.0, -1.0, 0.0, 2.0, 0.0);
        assert_eq!(out[1], 2.0);
    }

    #[test]
    fn test_to_scene_deterministic() {
        let a = to_scene(0.3, -0.7, 1.2, 5.0, -5.0);
        let b = to_scene(0.3, -0.7, 1.2, 5.0, -5.0);
        assert_eq!(a, b);
    }
}
