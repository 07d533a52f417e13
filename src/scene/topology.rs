//! 骨格トポロジと関節分類の固定テーブル。
//!
//! どのインデックスがどの関節か (左手首・右腰など) は推定器の出力順序契約で
//! 決まるため、各テーブルは参照トポロジとインデックス単位で一致させること。
//! プロセス起動時に一度定義され、実行時に変更されることはない。

/// 骨格の接続定義 (開始インデックス, 終了インデックス)
pub const CONNECTIONS: [(usize, usize); 29] = [
    // 頭部・目
    (0, 1),
    (1, 2),
    (2, 3),
    (0, 4),
    (4, 5),
    (5, 6),
    // 耳 → 肩
    (7, 11),
    (8, 12),
    // 左腕
    (11, 13),
    (13, 15),
    (15, 17),
    (17, 19),
    (19, 21),
    // 右腕
    (12, 14),
    (14, 16),
    (16, 18),
    (18, 20),
    (20, 22),
    // 左脚
    (11, 23),
    (23, 25),
    (25, 27),
    (27, 29),
    (29, 31),
    // 右脚
    (12, 24),
    (24, 26),
    (26, 28),
    (28, 30),
    (30, 32),
    // 腰 → 体中心
    (23, 33),
    (24, 33),
];

/// ルート扱いのインデックス (鼻と基準点)
pub const ROOT_INDICES: [usize; 2] = [0, 34];

/// 末端関節 (耳・手首・足首などの周辺部) のインデックス
pub const PERIPHERAL_INDICES: [usize; 19] = [
    1, 2, 3, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31, 33, 35, 36,
];

/// 関節マーカーの視覚クラス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointClass {
    Root,
    Peripheral,
    Torso,
}

/// インデックスから視覚クラスを引く。固定テーブル参照のみの純粋関数。
pub fn classify(index: usize) -> JointClass {
    if ROOT_INDICES.contains(&index) {
        JointClass::Root
    } else if PERIPHERAL_INDICES.contains(&index) {
        JointClass::Peripheral
    } else {
        JointClass::Torso
    }
}

/// ルート関節の色 (RGB)
pub const ROOT_COLOR: u32 = 0xFF0000; // 赤

/// 末端関節の色 (RGB)
pub const PERIPHERAL_COLOR: u32 = 0x00FF00; // 緑

/// 胴体関節の色 (RGB)
pub const TORSO_COLOR: u32 = 0xFFA500; // オレンジ

/// 骨格セグメントの色 (RGB)
pub const LIMB_COLOR: u32 = 0x0000FF; // 青

/// 視覚クラスに対応するマーカー色
pub fn class_color(class: JointClass) -> u32 {
    match class {
        JointClass::Root => ROOT_COLOR,
        JointClass::Peripheral => PERIPHERAL_COLOR,
        JointClass::Torso => TORSO_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::keypoint::KEYPOINT_COUNT;

    #[test]
    fn test_connection_count() {
        assert_eq!(CONNECTIONS.len(), 29);
    }

    #[test]
    fn test_topology_indices_within_bounds() {
        for &(start, end) in CONNECTIONS.iter() {
            assert!(start < KEYPOINT_COUNT, "start {} out of bounds", start);
            assert!(end < KEYPOINT_COUNT, "end {} out of bounds", end);
        }
    }

    #[test]
    fn test_classification_table_fidelity() {
        let peripheral = [
            1, 2, 3, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31, 33, 35, 36,
        ];
        for index in peripheral {
            assert_eq!(
                classify(index),
                JointClass::Peripheral,
                "index {} should be peripheral",
                index
            );
        }
        assert_eq!(classify(0), JointClass::Root);
        assert_eq!(classify(34), JointClass::Root);
        for index in [4, 5, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30, 32] {
            assert_eq!(
                classify(index),
                JointClass::Torso,
                "index {} should be torso",
                index
            );
        }
    }

    #[test]
    fn test_class_colors() {
        assert_eq!(class_color(JointClass::Root), 0xFF0000);
        assert_eq!(class_color(JointClass::Peripheral), 0x00FF00);
        assert_eq!(class_color(JointClass::Torso), 0xFFA500);
    }
}
