use anyhow::Result;
use std::sync::{mpsc, Mutex};
use std::time::Instant;

use bevy::prelude::*;
use opencv::core::Mat;

use pose_overlay::camera::ThreadedCamera;
use pose_overlay::config::Config;
use pose_overlay::pose::{preprocess_for_blazepose, Pose, PoseDetector};
use pose_overlay::render::overlay::{self, OverlayAssets, OverlayPrimitive};
use pose_overlay::scene::{build_frame, OverlayParams};

const CONFIG_PATH: &str = "config.toml";

/// 古すぎる推論リクエストを捨てる閾値 (秒)。ストール後のバックログ再生を防ぐ。
const STALE_REQUEST_SECS: f32 = 0.5;
/// 古すぎる推論結果を捨てる閾値 (秒)
const STALE_RESULT_SECS: f32 = 0.3;

// --- Inference thread types ---

struct EstimationRequest {
    frame: Mat,
    timestamp: Instant,
}

struct EstimationResult {
    poses: Vec<Pose>,
    timestamp: Instant,
}

// --- Bevy Resources ---

#[derive(Resource)]
struct CameraInput {
    camera: ThreadedCamera,
    last_frame_id: u64,
    /// 推論リクエストが未完了の間 true。高々1件しか同時に飛ばさない。
    in_flight: bool,
    /// 推論スレッドの死亡を検知済みなら true (エラーログは一度だけ出す)
    estimator_down: bool,
}

#[derive(Resource)]
struct EstimationTx(mpsc::SyncSender<EstimationRequest>);

#[derive(Resource)]
struct EstimationRx(Mutex<mpsc::Receiver<EstimationResult>>);

#[derive(Resource)]
struct PoseState {
    latest: Option<Pose>,
    /// 今tickでシーン再構築が必要か
    fresh: bool,
}

#[derive(Resource)]
struct OverlaySettings {
    params: OverlayParams,
}

#[derive(Resource)]
struct RenderSettings {
    sphere_radius: f32,
    tube_radius: f32,
}

#[derive(Resource)]
struct FpsCounter {
    frame_count: u32,
    estimate_count: u32,
    timer: Instant,
}

fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load_or_default(CONFIG_PATH);

    log::info!("pose-overlay {}", env!("GIT_VERSION"));
    log::info!("Model: {}", config.app.model);
    log::info!("Target FPS: {}", config.app.target_fps);

    // カメラとモデルはセッション開始前の致命的条件。どちらかが開けなければ
    // ループは開始しない。
    let camera = ThreadedCamera::start(
        config.camera.index,
        Some(config.camera.width),
        Some(config.camera.height),
        Some(config.app.target_fps),
    )?;
    let (width, height) = camera.resolution();
    log::info!("Camera {}: {}x{}", config.camera.index, width, height);

    let mut detector = PoseDetector::new(&config.app.model)?;
    log::info!("Model loaded");

    // 推論スレッド: sync_channel(1) + in_flightフラグで同時リクエストは常に1件
    let (frame_tx, frame_rx) = mpsc::sync_channel::<EstimationRequest>(1);
    let (result_tx, result_rx) = mpsc::channel::<EstimationResult>();

    std::thread::spawn(move || {
        while let Ok(req) = frame_rx.recv() {
            if req.timestamp.elapsed().as_secs_f32() > STALE_REQUEST_SECS {
                // 結果は常に返してin_flightを解除させる
                let _ = result_tx.send(EstimationResult {
                    poses: Vec::new(),
                    timestamp: req.timestamp,
                });
                continue;
            }

            let input = match preprocess_for_blazepose(&req.frame) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("preprocess error: {}", e);
                    let _ = result_tx.send(EstimationResult {
                        poses: Vec::new(),
                        timestamp: req.timestamp,
                    });
                    continue;
                }
            };
            // キャプチャフレームは前処理が済んだら即解放する。
            // サイクルを跨いで保持するとフレームバッファが際限なく溜まる。
            drop(req.frame);

            let poses = match detector.detect(input) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("inference error: {}", e);
                    Vec::new()
                }
            };
            let _ = result_tx.send(EstimationResult {
                poses,
                timestamp: req.timestamp,
            });
        }
    });

    let params = config.overlay.params();

    let exit = App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "pose-overlay".to_string(),
                // レンダリング面はビデオフレームのピクセル寸法に合わせる
                resolution: (width as f32, height as f32).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(CameraInput {
            camera,
            last_frame_id: 0,
            in_flight: false,
            estimator_down: false,
        })
        .insert_resource(EstimationTx(frame_tx))
        .insert_resource(EstimationRx(Mutex::new(result_rx)))
        .insert_resource(PoseState {
            latest: None,
            fresh: false,
        })
        .insert_resource(OverlaySettings { params })
        .insert_resource(RenderSettings {
            sphere_radius: config.overlay.sphere_radius,
            tube_radius: config.overlay.tube_radius,
        })
        .insert_resource(FpsCounter {
            frame_count: 0,
            estimate_count: 0,
            timer: Instant::now(),
        })
        .add_systems(Startup, setup_scene)
        .add_systems(
            Update,
            (
                send_frame_system,
                receive_results_system,
                rebuild_scene_system,
                fps_system,
            )
                .chain(),
        )
        .run();

    log::info!("Shutting down ({:?})", exit);
    Ok(())
}

// --- Systems ---

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<RenderSettings>,
) {
    overlay::spawn_scene_camera(&mut commands);
    let assets = OverlayAssets::create(
        &mut meshes,
        &mut materials,
        settings.sphere_radius,
        settings.tube_radius,
    );
    commands.insert_resource(assets);
}

/// 新しいカメラフレームがあれば推論スレッドへ送る。
/// リクエストが1件処理中の間は次のフレームを送らない (逐次、非パイプライン)。
fn send_frame_system(mut input: ResMut<CameraInput>, tx: Res<EstimationTx>) {
    if input.in_flight || input.estimator_down {
        return;
    }
    let fid = input.camera.frame_id();
    if fid == input.last_frame_id {
        return;
    }
    if let Some(frame) = input.camera.get_frame() {
        let req = EstimationRequest {
            frame,
            timestamp: Instant::now(),
        };
        match tx.0.try_send(req) {
            Ok(()) => {
                input.last_frame_id = fid;
                input.in_flight = true;
            }
            Err(mpsc::TrySendError::Full(_)) => {}
            Err(mpsc::TrySendError::Disconnected(_)) => {
                // 推論スレッドが死んでいる。黙って固まらず、一度だけ通知する。
                log::error!("Inference thread is gone; overlay will not update");
                input.estimator_down = true;
            }
        }
    }
}

fn receive_results_system(
    mut pose_state: ResMut<PoseState>,
    mut input: ResMut<CameraInput>,
    rx: Res<EstimationRx>,
    mut fps: ResMut<FpsCounter>,
) {
    let rx = rx.0.lock().unwrap();
    while let Ok(result) = rx.try_recv() {
        input.in_flight = false;
        if result.timestamp.elapsed().as_secs_f32() > STALE_RESULT_SECS {
            continue;
        }
        // 複数人検出されても先頭の1人だけを消費する。
        // 非検出フレームではlatestを触らず、前フレームのシーンを維持する。
        if let Some(pose) = result.poses.into_iter().next() {
            pose_state.latest = Some(pose);
            pose_state.fresh = true;
            fps.estimate_count += 1;
        }
    }
}

/// 推論結果のあったtickだけシーンを作り直す。
/// 前フレームのプリミティブを全て破棄してから今フレーム分を生成する。
/// 破棄が先でないと別フレームの骨格ジオメトリが混ざって残る。
fn rebuild_scene_system(
    mut commands: Commands,
    mut pose_state: ResMut<PoseState>,
    settings: Res<OverlaySettings>,
    assets: Res<OverlayAssets>,
    previous: Query<Entity, With<OverlayPrimitive>>,
) {
    if !pose_state.fresh {
        return;
    }
    pose_state.fresh = false;
    let Some(pose) = pose_state.latest.as_ref() else {
        return;
    };

    let frame = build_frame(pose, &settings.params);

    for entity in previous.iter() {
        commands.entity(entity).despawn();
    }
    overlay::spawn_frame(&mut commands, &assets, &frame);
}

fn fps_system(mut fps: ResMut<FpsCounter>, pose_state: Res<PoseState>) {
    fps.frame_count += 1;
    let elapsed = fps.timer.elapsed().as_secs_f32();
    if elapsed >= 1.0 {
        let avg = pose_state
            .latest
            .as_ref()
            .map(|p| p.average_score())
            .unwrap_or(0.0);
        log::info!(
            "FPS: {:.1} (estimates: {}) avg score: {:.2}",
            fps.frame_count as f32 / elapsed,
            fps.estimate_count,
            avg,
        );
        fps.frame_count = 0;
        fps.estimate_count = 0;
        fps.timer = Instant::now();
    }
}
