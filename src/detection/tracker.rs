//! 多标记跟踪
//! Multi-marker tracking with nearest-neighbour association
//!
//! 每个车轮上的反光标记对应一条轨迹 (Track):
//! - 每帧的亮斑质心按最近距离关联到已有轨迹 (门限 GATING_DISTANCE)
//! - 未关联的质心在容量允许时新建轨迹
//! - 超过 STALE_AFTER_MS 未更新的轨迹被删除

use std::collections::VecDeque;

use tracing::debug;

use super::types::Point;

/// 关联门限 (像素)
pub const GATING_DISTANCE: f32 = 100.0;

/// 轨迹过期时间 (毫秒)
pub const STALE_AFTER_MS: u64 = 1000;

// ========== 轨迹 ==========

/// 跟踪轨迹 (一个物理标记)
#[derive(Clone, Debug)]
pub struct Track {
    /// 唯一跟踪ID (进程内单调递增, 不复用)
    id: u32,

    /// 历史轨迹, 旧 → 新, 长度不超过 history_length
    path: VecDeque<Point>,

    /// 最近一次关联成功的时间 (毫秒)
    last_update_ms: u64,
}

impl Track {
    fn new(id: u32, point: Point, now_ms: u64) -> Self {
        let mut path = VecDeque::new();
        path.push_back(point);
        Self {
            id,
            path,
            last_update_ms: now_ms,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn path(&self) -> &VecDeque<Point> {
        &self.path
    }

    /// 最新位置 (path 非空)
    pub fn last_point(&self) -> Point {
        self.path.back().copied().unwrap_or_default()
    }

    /// 是否仍在有效期内
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_update_ms) < STALE_AFTER_MS
    }

    /// 追加轨迹点 (FIFO淘汰最旧点)
    fn push(&mut self, point: Point, now_ms: u64, history_length: usize) {
        self.path.push_back(point);
        self.trim(history_length);
        self.last_update_ms = now_ms;
    }

    fn trim(&mut self, history_length: usize) {
        while self.path.len() > history_length.max(1) {
            self.path.pop_front();
        }
    }
}

// ========== 关联策略 ==========

/// 检测点 → 轨迹 的关联策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssignmentPolicy {
    /// 逐个检测点按输入顺序找最近轨迹, 同一轨迹一帧内可吸收多个点
    NearestPerDetection,

    /// 全局按距离升序贪心匹配, 每条轨迹、每个检测点最多匹配一次
    #[default]
    OneToOne,
}

// ========== 轨迹管理器 ==========

/// 轨迹管理器 (轨迹集合的唯一所有者)
#[derive(Debug)]
pub struct TrackManager {
    /// 当前活跃轨迹
    tracks: Vec<Track>,

    /// 下一个分配的ID
    next_id: u32,

    /// 最大同时跟踪数
    max_tracks: usize,

    /// 轨迹长度上限
    history_length: usize,

    policy: AssignmentPolicy,
}

impl TrackManager {
    pub fn new(max_tracks: usize, history_length: usize) -> Self {
        Self::with_policy(max_tracks, history_length, AssignmentPolicy::default())
    }

    pub fn with_policy(max_tracks: usize, history_length: usize, policy: AssignmentPolicy) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            max_tracks,
            history_length: history_length.max(1),
            policy,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn set_max_tracks(&mut self, max_tracks: usize) {
        self.max_tracks = max_tracks;
    }

    /// 修改轨迹长度上限, 已有轨迹立即裁剪
    pub fn set_history_length(&mut self, history_length: usize) {
        self.history_length = history_length.max(1);
        for track in &mut self.tracks {
            track.trim(self.history_length);
        }
    }

    /// 清除所有轨迹 (ID计数不回退)
    pub fn reset(&mut self) {
        self.tracks.clear();
    }

    /// 更新跟踪器
    ///
    /// # 参数
    /// - `detections`: 当前帧的亮斑质心
    /// - `now_ms`: 当前时间 (毫秒, 由调用方提供)
    ///
    /// # 返回
    /// 更新后所有活跃轨迹
    pub fn update(&mut self, detections: &[Point], now_ms: u64) -> &[Track] {
        // 1. 关联已有轨迹
        let unmatched = match self.policy {
            AssignmentPolicy::NearestPerDetection => self.assign_sequential(detections, now_ms),
            AssignmentPolicy::OneToOne => self.assign_one_to_one(detections, now_ms),
        };

        // 2. 未关联的检测点 → 新建轨迹 (容量 = 本帧结束后仍存活的轨迹数)
        let mut alive = self.tracks.iter().filter(|t| t.is_fresh(now_ms)).count();
        for point in unmatched {
            if alive >= self.max_tracks {
                break;
            }
            let id = self.next_id;
            self.next_id += 1;
            self.tracks.push(Track::new(id, point, now_ms));
            alive += 1;
            debug!("🆕 新建轨迹 #{} @ ({:.1}, {:.1})", id, point.x, point.y);
        }

        // 3. 删除过期轨迹
        self.tracks.retain(|t| {
            let fresh = t.is_fresh(now_ms);
            if !fresh {
                debug!("🗑️ 轨迹 #{} 过期删除", t.id);
            }
            fresh
        });

        &self.tracks
    }

    /// 门限内最近的轨迹下标
    fn nearest_track(&self, point: &Point) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, track) in self.tracks.iter().enumerate() {
            let d = point.distance(&track.last_point());
            if d < GATING_DISTANCE && best.map_or(true, |(_, bd)| d < bd) {
                best = Some((idx, d));
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// 按输入顺序逐点关联, 返回未关联的检测点
    fn assign_sequential(&mut self, detections: &[Point], now_ms: u64) -> Vec<Point> {
        let mut unmatched = Vec::new();
        for point in detections {
            match self.nearest_track(point) {
                Some(idx) => self.tracks[idx].push(*point, now_ms, self.history_length),
                None => unmatched.push(*point),
            }
        }
        unmatched
    }

    /// 贪心一对一匹配: 所有候选对按距离排序, 依次占用
    fn assign_one_to_one(&mut self, detections: &[Point], now_ms: u64) -> Vec<Point> {
        let mut candidates = Vec::new();
        for (det_idx, point) in detections.iter().enumerate() {
            for (track_idx, track) in self.tracks.iter().enumerate() {
                let d = point.distance(&track.last_point());
                if d < GATING_DISTANCE {
                    candidates.push((d, det_idx, track_idx));
                }
            }
        }

        // 距离相同时按检测顺序、轨迹顺序
        candidates.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        let mut used_det = vec![false; detections.len()];
        let mut used_track = vec![false; self.tracks.len()];
        for (_, det_idx, track_idx) in candidates {
            if !used_det[det_idx] && !used_track[track_idx] {
                used_det[det_idx] = true;
                used_track[track_idx] = true;
                self.tracks[track_idx].push(detections[det_idx], now_ms, self.history_length);
            }
        }

        detections
            .iter()
            .zip(used_det)
            .filter(|(_, used)| !used)
            .map(|(p, _)| *p)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tracks: &[Track]) -> Vec<u32> {
        let mut ids: Vec<u32> = tracks.iter().map(|t| t.id()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_single_marker_single_track() {
        let mut manager = TrackManager::new(3, 50);
        for i in 0..20 {
            let p = Point::new(100.0 + i as f32 * 3.0, 100.0);
            manager.update(&[p], i * 33);
        }
        assert_eq!(manager.track_count(), 1);
        assert_eq!(manager.tracks()[0].path().len(), 20);
    }

    #[test]
    fn test_history_is_bounded_fifo() {
        let mut manager = TrackManager::new(3, 10);
        for i in 0..25u64 {
            manager.update(&[Point::new(i as f32, 0.0)], i * 10);
        }
        let track = &manager.tracks()[0];
        assert_eq!(track.path().len(), 10);
        assert_eq!(track.path().front(), Some(&Point::new(15.0, 0.0)));
        assert_eq!(track.last_point(), Point::new(24.0, 0.0));
    }

    #[test]
    fn test_far_detection_spawns_new_track() {
        let mut manager = TrackManager::new(3, 50);
        manager.update(&[Point::new(10.0, 10.0)], 0);
        manager.update(&[Point::new(12.0, 10.0), Point::new(300.0, 10.0)], 33);
        assert_eq!(ids(manager.tracks()), vec![1, 2]);
    }

    #[test]
    fn test_gating_distance_is_exclusive() {
        let mut manager = TrackManager::new(3, 50);
        manager.update(&[Point::new(0.0, 0.0)], 0);
        manager.update(&[Point::new(100.0, 0.0)], 10);
        assert_eq!(manager.track_count(), 2);
    }

    #[test]
    fn test_capacity_limit() {
        let mut manager = TrackManager::new(2, 50);
        let points = [
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(400.0, 0.0),
        ];
        manager.update(&points, 0);
        assert_eq!(ids(manager.tracks()), vec![1, 2]);
    }

    #[test]
    fn test_stale_track_removed() {
        let mut manager = TrackManager::new(3, 50);
        manager.update(&[Point::new(50.0, 50.0)], 0);

        manager.update(&[], 999);
        assert_eq!(manager.track_count(), 1);

        manager.update(&[], 1000);
        assert_eq!(manager.track_count(), 0);
    }

    #[test]
    fn test_ids_never_reused() {
        let mut manager = TrackManager::new(1, 50);
        manager.update(&[Point::new(0.0, 0.0)], 0);
        manager.update(&[], 5000);
        assert_eq!(manager.track_count(), 0);

        manager.update(&[Point::new(0.0, 0.0)], 5100);
        assert_eq!(ids(manager.tracks()), vec![2]);

        manager.reset();
        manager.update(&[Point::new(0.0, 0.0)], 5200);
        assert_eq!(ids(manager.tracks()), vec![3]);
    }

    #[test]
    fn test_stale_track_frees_capacity() {
        let mut manager = TrackManager::new(1, 50);
        manager.update(&[Point::new(0.0, 0.0)], 0);
        // 旧轨迹已过期, 新位置超出门限 → 替换
        manager.update(&[Point::new(500.0, 0.0)], 1500);
        assert_eq!(ids(manager.tracks()), vec![2]);
    }

    #[test]
    fn test_one_to_one_prefers_closest_pair() {
        let mut manager = TrackManager::new(3, 50);
        manager.update(&[Point::new(0.0, 0.0), Point::new(150.0, 0.0)], 0);

        // 第一个检测点离轨迹1较远, 第二个更近; 一对一匹配后各归其位
        let dets = [Point::new(60.0, 0.0), Point::new(5.0, 0.0)];
        manager.update(&dets, 33);

        let t1 = manager.tracks().iter().find(|t| t.id() == 1).unwrap();
        let t2 = manager.tracks().iter().find(|t| t.id() == 2).unwrap();
        assert_eq!(t1.last_point(), Point::new(5.0, 0.0));
        assert_eq!(t2.last_point(), Point::new(60.0, 0.0));
    }

    #[test]
    fn test_sequential_policy_can_share_track() {
        let mut manager = TrackManager::with_policy(3, 50, AssignmentPolicy::NearestPerDetection);
        manager.update(&[Point::new(0.0, 0.0)], 0);
        manager.update(&[Point::new(5.0, 0.0), Point::new(8.0, 0.0)], 33);

        assert_eq!(manager.track_count(), 1);
        assert_eq!(manager.tracks()[0].path().len(), 3);
    }

    #[test]
    fn test_shrinking_history_trims_paths() {
        let mut manager = TrackManager::new(3, 50);
        for i in 0..30u64 {
            manager.update(&[Point::new(i as f32, 0.0)], i);
        }
        manager.set_history_length(5);
        assert_eq!(manager.tracks()[0].path().len(), 5);
    }
}
