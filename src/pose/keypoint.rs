/// 推定器が返すキーポイント数 (BlazePose系: 33標準ランドマーク + 4補助点)
pub const KEYPOINT_COUNT: usize = 37;

/// 単一キーポイント
///
/// 座標は推定器ネイティブ空間 (腰中心・メートル単位)。
/// フレーム毎に新しく生成され、フレームを跨いで保持されない。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub score: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, z: f32, score: f32) -> Self {
        Self { x, y, z, score }
    }

    /// スコアが閾値を厳密に上回るか
    pub fn passes(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            score: 0.0,
        }
    }
}

/// 1フレーム・1人分の姿勢
///
/// キーポイントは推定器の固定出力順で並ぶ。期待長は KEYPOINT_COUNT だが、
/// それより短い部分的なPoseも有効な入力として扱う。欠けたインデックスへの
/// アクセスは None になるだけでエラーではない。
#[derive(Debug, Clone, Default)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// インデックスでキーポイントを取得。範囲外はNone。
    pub fn get(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index)
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// 全キーポイントの平均スコア (診断ログ用)
    pub fn average_score(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.keypoints.iter().map(|k| k.score).sum();
        sum / self.keypoints.len() as f32
    }
}
