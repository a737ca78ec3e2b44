//! 实时状态面板 (文本)

use std::fmt::Write;

use crate::detection::TargetResult;

/// 输出 max_wheels 个车轮槽位的状态
///
/// 槽位按ID顺序依次填入存活的车轮 (ID不复用, 重新捕获的车轮ID可能大于max_wheels),
/// 每行标注车轮的真实ID; 空余槽位接着最大ID往后编号, 显示等待.
pub fn status_board(targets: &[TargetResult], max_wheels: usize) -> String {
    let mut live: Vec<&TargetResult> = targets.iter().collect();
    live.sort_by_key(|t| t.id);

    let mut board = String::new();
    let mut label = 0u32;
    for slot in 0..max_wheels {
        match live.get(slot) {
            Some(t) => {
                label = label.max(t.id);
                let _ = writeln!(
                    board,
                    "Wheel {}: {:.2} mm [{}]",
                    t.id,
                    t.wobble_mm,
                    t.status.label()
                );
            }
            None => {
                label += 1;
                let _ = writeln!(board, "Wheel {}: Awaiting detection...", label);
            }
        }
    }
    board
}
