/// 车轮摆动哨兵 (Wobble Sentinel)
///
/// 实时车轮摆动监测
///
/// 系统架构:
/// 1. 采集线程: 帧源读取 (独立工作线程)
/// 2. 主线程:   检测 → 跟踪 → 摆动分析 (逐帧同步)
use std::path::PathBuf;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use crossbeam_channel::{bounded, Sender};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wobble_sentinel::advisory::DiagnosisClient;
use wobble_sentinel::input::{FrameSource, ImageSequenceSource, SyntheticSource};
use wobble_sentinel::pipeline::{status_board, AcquisitionEvent, FrameReport};
use wobble_sentinel::{
    gen_time_string, renderer, AssignmentPolicy, TargetResult, WobblePipeline, WobbleSettings,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// 关联策略
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    /// 全局按距离一对一匹配
    OneToOne,
    /// 逐点最近匹配
    Nearest,
}

impl From<Policy> for AssignmentPolicy {
    fn from(p: Policy) -> Self {
        match p {
            Policy::OneToOne => AssignmentPolicy::OneToOne,
            Policy::Nearest => AssignmentPolicy::NearestPerDetection,
        }
    }
}

/// 摆动哨兵参数
#[derive(Parser, Debug)]
#[command(author, version, about = "车轮摆动哨兵 - 实时摆动监测", long_about = None)]
struct Args {
    /// 输入源: synthetic 或 图片序列目录
    #[arg(short, long, default_value = "synthetic")]
    source: String,

    /// 配置文件 (默认: 用户配置目录/wobble-sentinel/settings.json)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// 合成输入的总帧数
    #[arg(long, default_value_t = 240)]
    frames: u64,

    /// 帧率 (决定时间戳)
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// 合成车轮数
    #[arg(long, default_value_t = 3)]
    wheels: usize,

    /// 合成车轮的径向摆动峰峰值 (像素)
    #[arg(long, default_value_t = 2.0)]
    wobble_px: f32,

    /// 合成画面每帧噪点数
    #[arg(long, default_value_t = 20)]
    speckle: usize,

    /// 关联策略
    #[arg(long, value_enum, default_value_t = Policy::OneToOne)]
    policy: Policy,

    /// 叠加图输出目录 (每秒一张)
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// 以JSON输出最后一帧结果
    #[arg(long)]
    json: bool,

    /// 结束后请求远程诊断
    #[arg(long)]
    diagnose: bool,

    /// 诊断服务地址
    #[arg(long)]
    endpoint: Option<String>,

    /// 诊断模型
    #[arg(long)]
    model: Option<String>,
}

fn open_source(args: &Args) -> Result<Box<dyn FrameSource>> {
    if args.source == "synthetic" {
        let source = SyntheticSource::row(1280, 720, args.wheels, args.wobble_px, args.fps)
            .with_frame_limit(args.frames)
            .with_speckle(args.speckle, 42);
        Ok(Box::new(source))
    } else {
        let source = ImageSequenceSource::open(&args.source, args.fps)
            .with_context(|| format!("无法打开图片序列: {}", args.source))?;
        if source.is_empty() {
            bail!("图片序列为空: {}", args.source);
        }
        Ok(Box::new(source))
    }
}

/// 采集线程: 读帧 → 通道
fn acquisition_loop(mut source: Box<dyn FrameSource>, tx: Sender<AcquisitionEvent>) {
    info!("📹 采集线程启动: {}", source.name());
    loop {
        let event = match source.next_frame() {
            Ok(Some(frame)) => AcquisitionEvent::Frame(frame),
            Ok(None) => AcquisitionEvent::EndOfStream,
            Err(e) => AcquisitionEvent::Error(e.to_string()),
        };
        let done = !matches!(event, AcquisitionEvent::Frame(_));
        if tx.send(event).is_err() || done {
            break;
        }
    }
    info!("📹 采集线程退出");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wobble_sentinel=info,sentinel=info")),
        )
        .init();

    let args = Args::parse();

    info!("🚀 车轮摆动哨兵启动");

    let settings_path = args.settings.clone().unwrap_or_else(WobbleSettings::default_path);
    let settings = WobbleSettings::load(&settings_path)
        .with_context(|| format!("配置加载失败: {}", settings_path.display()))?;
    settings.print_summary();

    let mut pipeline = WobblePipeline::with_policy(settings, args.policy.into())?;

    if let Some(dir) = &args.overlay_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("无法创建输出目录: {}", dir.display()))?;
    }

    // ========== 启动采集线程 ==========
    let source = open_source(&args)?;
    let (tx, rx) = bounded::<AcquisitionEvent>(2);
    let acquisition = thread::spawn(move || acquisition_loop(source, tx));

    // ========== 主线程: 逐帧处理 ==========
    let mut last_report: Option<FrameReport> = None;
    let mut next_board_ms = 0u64;
    let mut total_ms = 0.0f64;
    let mut frames = 0u64;
    let mut acquisition_error: Option<String> = None;

    for event in rx.iter() {
        let frame = match event {
            AcquisitionEvent::Frame(frame) => frame,
            AcquisitionEvent::EndOfStream => {
                info!("🏁 输入结束");
                break;
            }
            AcquisitionEvent::Error(e) => {
                error!("❌ 采集失败: {}", e);
                acquisition_error = Some(e);
                break;
            }
        };

        let report = match frame.as_frame() {
            Ok(view) => pipeline.process_frame(&view, frame.timestamp_ms),
            Err(e) => {
                warn!("⚠️ 丢弃帧 #{}: {}", frame.frame_id, e);
                continue;
            }
        };
        total_ms += report.process_ms;
        frames += 1;

        // 每秒 (按流时间) 输出一次状态
        if frame.timestamp_ms >= next_board_ms {
            next_board_ms = frame.timestamp_ms + 1000;
            info!(
                "📊 帧 #{} | 亮斑 {} | 车轮 {}\n{}",
                frame.frame_id,
                report.blob_count,
                report.targets.len(),
                status_board(&report.targets, pipeline.settings().max_wheels)
            );

            if let Some(dir) = &args.overlay_dir {
                if let Some(mut canvas) = frame.to_rgb_image() {
                    renderer::draw_overlay(&mut canvas, &report.targets);
                    let path = dir.join(format!(
                        "wobble_{}_{:06}.png",
                        gen_time_string("-"),
                        frame.frame_id
                    ));
                    if let Err(e) = canvas.save(&path) {
                        warn!("⚠️ 叠加图保存失败 {}: {}", path.display(), e);
                    }
                }
            }
        }

        last_report = Some(report);
    }

    if acquisition.join().is_err() {
        warn!("⚠️ 采集线程异常退出");
    }

    if frames > 0 {
        info!(
            "✅ 共处理 {} 帧, 平均 {:.2} ms/帧",
            frames,
            total_ms / frames as f64
        );
    }

    let targets = last_report.map(|r| r.targets).unwrap_or_default();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
    } else {
        println!("{}", status_board(&targets, pipeline.settings().max_wheels));
    }

    stream_outcome(acquisition_error, frames)?;

    if args.diagnose {
        let mut client = DiagnosisClient::from_env();
        if let Some(endpoint) = &args.endpoint {
            client = client.with_endpoint(endpoint.clone());
        }
        if let Some(model) = &args.model {
            client = client.with_model(model.clone());
        }
        let text = request_diagnosis(&client, &targets, pipeline.settings())?;
        println!("\n🤖 AI Diagnosis:\n{}", text);
    }

    Ok(())
}

/// 采集中断时以错误退出 (结果已输出)
fn stream_outcome(acquisition_error: Option<String>, frames: u64) -> Result<()> {
    match acquisition_error {
        Some(e) => bail!("采集中断 (已处理 {} 帧): {}", frames, e),
        None => Ok(()),
    }
}

fn request_diagnosis(
    client: &DiagnosisClient,
    targets: &[TargetResult],
    settings: &WobbleSettings,
) -> Result<String> {
    if !targets.is_empty() && !client.has_key() {
        bail!("未配置 GEMINI_API_KEY / API_KEY, 无法请求诊断");
    }
    client
        .diagnose(targets, settings)
        .map_err(|e| anyhow!("诊断失败: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wobble_sentinel::advisory::{DEFAULT_MODEL, NO_WHEELS_MESSAGE};
    use wobble_sentinel::{OwnedFrame, WheelStatus};

    struct FailingSource {
        served: u64,
    }

    impl FrameSource for FailingSource {
        fn next_frame(&mut self) -> wobble_sentinel::Result<Option<OwnedFrame>> {
            if self.served == 0 {
                self.served += 1;
                let image = image::RgbImage::new(4, 4);
                return Ok(Some(OwnedFrame::from_rgb_image(image, 0, 0)));
            }
            Err(wobble_sentinel::WobbleError::Advisory("decode failed".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_acquisition_error_is_forwarded() {
        let (tx, rx) = bounded(4);
        acquisition_loop(Box::new(FailingSource { served: 0 }), tx);
        let events: Vec<AcquisitionEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AcquisitionEvent::Frame(_)));
        assert!(matches!(&events[1], AcquisitionEvent::Error(e) if e.contains("decode failed")));
    }

    #[test]
    fn test_stream_outcome() {
        assert!(stream_outcome(None, 10).is_ok());
        let err = stream_outcome(Some("bad image".into()), 3).unwrap_err();
        assert!(err.to_string().contains("bad image"));
    }

    #[test]
    fn test_diagnosis_without_key_fails() {
        let client = DiagnosisClient::new("http://127.0.0.1:9", DEFAULT_MODEL, None);
        let settings = WobbleSettings::default();
        assert_eq!(
            request_diagnosis(&client, &[], &settings).unwrap(),
            NO_WHEELS_MESSAGE
        );

        let targets = vec![TargetResult {
            id: 1,
            wobble_mm: 0.5,
            status: WheelStatus::Ok,
            trajectory: Vec::new(),
            center: None,
            avg_radius: 0.0,
        }];
        assert!(request_diagnosis(&client, &targets, &settings).is_err());
    }
}
