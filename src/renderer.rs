//! 叠加绘制 (只读消费分析结果)
//! Overlay renderer: trajectories, fitted circle and status markers

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};

use crate::detection::TargetResult;

/// 轨迹颜色 #58A6FF
const TRAJECTORY_COLOR: Rgb<u8> = Rgb([0x58, 0xA6, 0xFF]);
/// 圆心/平均半径颜色 (金色)
const CENTER_COLOR: Rgb<u8> = Rgb([255, 215, 0]);

const CENTER_DOT_RADIUS: i32 = 5;
const MARKER_RADIUS: i32 = 10;

/// 在帧上绘制所有车轮的轨迹、拟合圆和当前位置
pub fn draw_overlay(canvas: &mut RgbImage, targets: &[TargetResult]) {
    for target in targets {
        // 轨迹折线
        for pair in target.trajectory.windows(2) {
            draw_line_segment_mut(
                canvas,
                (pair[0].x, pair[0].y),
                (pair[1].x, pair[1].y),
                TRAJECTORY_COLOR,
            );
        }

        // 圆心 + 平均半径圆
        if let Some(center) = target.center {
            let c = (center.x.round() as i32, center.y.round() as i32);
            draw_filled_circle_mut(canvas, c, CENTER_DOT_RADIUS, CENTER_COLOR);
            draw_hollow_circle_mut(canvas, c, target.avg_radius.round() as i32, CENTER_COLOR);
        }

        // 当前位置 (按状态着色)
        if let Some(p) = target.current_position() {
            let (r, g, b) = target.status.color();
            draw_filled_circle_mut(
                canvas,
                (p.x.round() as i32, p.y.round() as i32),
                MARKER_RADIUS,
                Rgb([r, g, b]),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Point, WheelStatus};

    #[test]
    fn test_marker_colored_by_status() {
        let mut canvas = RgbImage::new(100, 100);
        let targets = vec![TargetResult {
            id: 1,
            wobble_mm: 2.0,
            status: WheelStatus::Alert,
            trajectory: vec![Point::new(20.0, 20.0), Point::new(50.0, 50.0)],
            center: Some(Point::new(80.0, 80.0)),
            avg_radius: 8.0,
        }];
        draw_overlay(&mut canvas, &targets);

        assert_eq!(canvas.get_pixel(50, 50), &Rgb([0xDA, 0x36, 0x33]));
        assert_eq!(canvas.get_pixel(80, 80), &CENTER_COLOR);
        assert_eq!(canvas.get_pixel(20, 20), &TRAJECTORY_COLOR);
        assert_eq!(canvas.get_pixel(5, 95), &Rgb([0, 0, 0]));
    }
}
