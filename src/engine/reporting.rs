// ==========================================
// 饲料装车看板 - 报表聚合器
// ==========================================
// 职责: 基于货物历史/时长台账与饲料需求计算 KPI
// 红线: 只读,不修改引擎状态
// 说明: 每状态平均时长保留两种算法并列输出 (台账累计 / 历史重扫)
// ==========================================

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::kanban_config::KanbanConfig;
use crate::domain::cargo::Cargo;
use crate::domain::ration_demand::RationDemand;
use crate::domain::types::{CargoStatus, FabricationStatus, FleetType};

const MS_PER_MINUTE: f64 = 60_000.0;

// ==========================================
// 输入/输出结构
// ==========================================

/// 报表过滤条件 (None 表示不过滤)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub fleet_type: Option<FleetType>,
    pub status: Option<CargoStatus>,
}

impl ReportFilter {
    pub fn matches(&self, cargo: &Cargo) -> bool {
        self.fleet_type.map_or(true, |f| cargo.fleet_type == f)
            && self.status.map_or(true, |s| cargo.status == s)
    }
}

/// 总览指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_cargos: usize,
    pub loaded: usize,
    pub invoiced: usize,
    pub in_progress: usize,
    /// (loaded + invoiced) / total × 100
    pub completion_pct: f64,
}

/// 分布条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionEntry {
    pub id: String,
    pub label: String,
    pub count: usize,
}

/// 每状态平均停留时长
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTimeEntry {
    pub status: CargoStatus,
    pub label: String,
    /// 到访过该状态的货物数 (两种算法共同的分母)
    pub visited_cargos: usize,
    /// 台账算法: 已关闭阶段累计 / 到访货物数
    pub ledger_avg_minutes: f64,
    /// 重扫算法: 每次到访取 "时间戳严格更晚的第一条事件" 的差值
    pub rescan_avg_minutes: f64,
}

/// 18:00 → 18:00 周期窗口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub dispatched: usize,
    pub tonnes: f64,
    pub loaded: usize,
    pub invoiced: usize,
    pub invoiced_tonnes: f64,
    /// 已开票货物平均 (首→末事件分钟 / 吨)
    pub avg_minutes_per_tonne: f64,
    /// 已开票吨位 / 目标吨位 × 100
    pub efficiency_pct: f64,
}

/// 饲料需求看板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandBoard {
    pub by_status: Vec<DistributionEntry>,
    pub pending_demands: usize,
    pub pending_sacks: u64,
    pub pending_tonnes: f64,
}

/// 完整报表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KanbanReport {
    pub generated_at: DateTime<Utc>,
    pub filter: ReportFilter,
    pub summary: KpiSummary,
    pub by_status: Vec<DistributionEntry>,
    pub by_fleet: Vec<DistributionEntry>,
    pub status_times: Vec<StatusTimeEntry>,
    pub avg_minutes_to_invoice: f64,
    pub cycles: Vec<CycleWindow>,
    pub demand_board: DemandBoard,
}

// ==========================================
// ReportingAggregator
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ReportingAggregator {
    config: KanbanConfig,
}

impl ReportingAggregator {
    pub fn new(config: KanbanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KanbanConfig {
        &self.config
    }

    /// 生成完整报表
    ///
    /// # 参数
    /// - cargos: 全部货物 (按 filter 过滤)
    /// - demands: 全部饲料需求 (不受货物过滤影响)
    /// - filter: 过滤条件
    /// - now: 报表时间 (决定周期窗口)
    pub fn report(
        &self,
        cargos: &[Cargo],
        demands: &[RationDemand],
        filter: ReportFilter,
        now: DateTime<Utc>,
    ) -> KanbanReport {
        let filtered: Vec<&Cargo> = cargos.iter().filter(|c| filter.matches(c)).collect();

        KanbanReport {
            generated_at: now,
            filter,
            summary: summarize(&filtered),
            by_status: status_distribution(&filtered),
            by_fleet: fleet_distribution(&filtered),
            status_times: CargoStatus::ALL
                .iter()
                .map(|s| status_time(&filtered, *s))
                .collect(),
            avg_minutes_to_invoice: avg_minutes_to_invoice(&filtered),
            cycles: self.cycles(&filtered, now),
            demand_board: self.demand_board(demands),
        }
    }

    /// 最近 N 个周期窗口 (旧 → 新),按下发时间归属
    pub fn cycles(&self, cargos: &[&Cargo], now: DateTime<Utc>) -> Vec<CycleWindow> {
        let current_start = current_cycle_start(now, &self.config);
        let count = i64::from(self.config.cycle_window_count);

        (0..count)
            .rev()
            .map(|back| {
                let start = current_start - Duration::days(back);
                let end = start + Duration::days(1);
                let in_window: Vec<&Cargo> = cargos
                    .iter()
                    .copied()
                    .filter(|c| c.dispatched_at >= start && c.dispatched_at < end)
                    .collect();
                self.cycle_window(start, end, &in_window)
            })
            .collect()
    }

    fn cycle_window(&self, start: DateTime<Utc>, end: DateTime<Utc>, cargos: &[&Cargo]) -> CycleWindow {
        let invoiced: Vec<&Cargo> = cargos
            .iter()
            .copied()
            .filter(|c| c.status == CargoStatus::Invoiced)
            .collect();
        let invoiced_tonnes: f64 = invoiced.iter().map(|c| c.weight_tonnes()).sum();

        let per_tonne: Vec<f64> = invoiced
            .iter()
            .filter_map(|c| {
                let (first, last) = (c.first_event()?, c.last_event()?);
                let minutes = (last.timestamp - first.timestamp).num_milliseconds() as f64 / MS_PER_MINUTE;
                let tonnes = c.weight_tonnes();
                (tonnes > 0.0 && minutes > 0.0).then(|| minutes / tonnes)
            })
            .collect();

        CycleWindow {
            start,
            end,
            dispatched: cargos.len(),
            tonnes: cargos.iter().map(|c| c.weight_tonnes()).sum(),
            loaded: cargos.iter().filter(|c| c.status == CargoStatus::Loaded).count(),
            invoiced: invoiced.len(),
            invoiced_tonnes,
            avg_minutes_per_tonne: mean(&per_tonne),
            efficiency_pct: invoiced_tonnes / self.config.cycle_target_tonnes * 100.0,
        }
    }

    /// 饲料需求看板
    pub fn demand_board(&self, demands: &[RationDemand]) -> DemandBoard {
        let by_status = FabricationStatus::ALL
            .iter()
            .map(|s| DistributionEntry {
                id: s.as_str().to_string(),
                label: s.label().to_string(),
                count: demands.iter().filter(|d| d.fabrication_status == *s).count(),
            })
            .collect();

        let pending: Vec<&RationDemand> = demands
            .iter()
            .filter(|d| d.fabrication_status.is_pending())
            .collect();
        let pending_sacks: u64 = pending.iter().map(|d| u64::from(d.sack_count)).sum();

        DemandBoard {
            by_status,
            pending_demands: pending.len(),
            pending_sacks,
            pending_tonnes: pending_sacks as f64 * self.config.sack_weight_kg / 1000.0,
        }
    }
}

// ==========================================
// 纯函数
// ==========================================

fn summarize(cargos: &[&Cargo]) -> KpiSummary {
    let total = cargos.len();
    let loaded = cargos.iter().filter(|c| c.status == CargoStatus::Loaded).count();
    let invoiced = cargos.iter().filter(|c| c.status == CargoStatus::Invoiced).count();
    let completion_pct = if total == 0 {
        0.0
    } else {
        (loaded + invoiced) as f64 / total as f64 * 100.0
    };

    KpiSummary {
        total_cargos: total,
        loaded,
        invoiced,
        in_progress: total - loaded - invoiced,
        completion_pct,
    }
}

fn status_distribution(cargos: &[&Cargo]) -> Vec<DistributionEntry> {
    CargoStatus::ALL
        .iter()
        .map(|s| DistributionEntry {
            id: s.as_str().to_string(),
            label: s.label().to_string(),
            count: cargos.iter().filter(|c| c.status == *s).count(),
        })
        .collect()
}

fn fleet_distribution(cargos: &[&Cargo]) -> Vec<DistributionEntry> {
    FleetType::ALL
        .iter()
        .map(|f| DistributionEntry {
            id: f.as_str().to_string(),
            label: f.label().to_string(),
            count: cargos.iter().filter(|c| c.fleet_type == *f).count(),
        })
        .collect()
}

/// 单个状态的两种平均时长
pub fn status_time(cargos: &[&Cargo], status: CargoStatus) -> StatusTimeEntry {
    let visited: Vec<&Cargo> = cargos
        .iter()
        .copied()
        .filter(|c| c.has_visited(status))
        .collect();

    let (ledger_avg_minutes, rescan_avg_minutes) = if visited.is_empty() {
        (0.0, 0.0)
    } else {
        let n = visited.len() as f64;
        let ledger_ms: i64 = visited.iter().map(|c| c.duration_in(status)).sum();
        let rescan_ms: i64 = visited.iter().map(|c| rescan_duration_ms(c, status)).sum();
        (
            ledger_ms as f64 / n / MS_PER_MINUTE,
            rescan_ms as f64 / n / MS_PER_MINUTE,
        )
    };

    StatusTimeEntry {
        status,
        label: status.label().to_string(),
        visited_cargos: visited.len(),
        ledger_avg_minutes,
        rescan_avg_minutes,
    }
}

/// 历史重扫: 对每次到访,取时间戳严格更晚的第一条事件
///
/// 相同时间戳的连续事件会各自计到同一个 "下一事件",因此可能重复计数
pub fn rescan_duration_ms(cargo: &Cargo, status: CargoStatus) -> i64 {
    cargo
        .history
        .iter()
        .filter(|e| e.status == status)
        .filter_map(|e| {
            cargo
                .history
                .iter()
                .find(|next| next.timestamp > e.timestamp)
                .map(|next| (next.timestamp - e.timestamp).num_milliseconds())
        })
        .sum()
}

/// 已开票货物: 首事件 → 末事件 的平均分钟数
pub fn avg_minutes_to_invoice(cargos: &[&Cargo]) -> f64 {
    let spans: Vec<f64> = cargos
        .iter()
        .filter(|c| c.status == CargoStatus::Invoiced && c.history.len() >= 2)
        .filter_map(|c| {
            let (first, last) = (c.first_event()?, c.last_event()?);
            Some((last.timestamp - first.timestamp).num_milliseconds() as f64 / MS_PER_MINUTE)
        })
        .collect();
    mean(&spans)
}

/// 当前周期起点: 本地时间 (UTC + offset) 不晚于 now 的最近一个 start_hour:00
pub fn current_cycle_start(now: DateTime<Utc>, config: &KanbanConfig) -> DateTime<Utc> {
    let offset = Duration::minutes(i64::from(config.cycle_utc_offset_minutes));
    let start_time = NaiveTime::from_hms_opt(config.cycle_start_hour, 0, 0).unwrap_or(NaiveTime::MIN);

    let local_now = now.naive_utc() + offset;
    let mut local_start = local_now.date().and_time(start_time);
    if local_start > local_now {
        local_start -= Duration::days(1);
    }
    DateTime::<Utc>::from_naive_utc_and_offset(local_start - offset, Utc)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cargo::{DraftCargo, HistoryEvent};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn cargo_with_history(id: &str, steps: &[(CargoStatus, DateTime<Utc>)]) -> Cargo {
        let mut cargo = Cargo::from_draft(
            DraftCargo {
                id: id.to_string(),
                romaneio: id.to_string(),
                weight_kg: 10_000.0,
                description: String::new(),
                fleet_type: FleetType::Owned,
                sequence: 1,
            },
            steps[0].1,
            "system",
        );
        cargo.history.clear();
        cargo.status = steps[0].0;
        for (status, ts) in steps {
            if let Some(prev) = cargo.history.last() {
                *cargo.durations_ms.entry(prev.status).or_insert(0) +=
                    (*ts - prev.timestamp).num_milliseconds();
            }
            cargo.history.push(HistoryEvent {
                status: *status,
                timestamp: *ts,
                actor: "ana".to_string(),
                note: None,
            });
            cargo.status = *status;
        }
        cargo
    }

    #[test]
    fn test_ledger_and_rescan_agree_without_ties() {
        let cargo = cargo_with_history(
            "C1",
            &[
                (CargoStatus::AwaitingLoading, at(8, 0)),
                (CargoStatus::Loading, at(8, 30)),
                (CargoStatus::AwaitingLoading, at(9, 0)),
                (CargoStatus::Loading, at(9, 10)),
            ],
        );
        let entry = status_time(&[&cargo], CargoStatus::AwaitingLoading);
        assert_eq!(entry.visited_cargos, 1);
        assert_eq!(entry.ledger_avg_minutes, 40.0);
        assert_eq!(entry.rescan_avg_minutes, 40.0);
    }

    #[test]
    fn test_rescan_double_counts_equal_timestamps() {
        // awaiting-loading → loading 在同一时刻完成 (瞬时跳转)
        let cargo = cargo_with_history(
            "C1",
            &[
                (CargoStatus::AwaitingLoading, at(8, 0)),
                (CargoStatus::Loading, at(8, 0)),
                (CargoStatus::Loaded, at(8, 20)),
            ],
        );

        assert_eq!(cargo.duration_in(CargoStatus::AwaitingLoading), 0);
        assert_eq!(rescan_duration_ms(&cargo, CargoStatus::AwaitingLoading), 20 * 60_000);

        let entry = status_time(&[&cargo], CargoStatus::AwaitingLoading);
        assert_eq!(entry.ledger_avg_minutes, 0.0);
        assert_eq!(entry.rescan_avg_minutes, 20.0);
    }

    #[test]
    fn test_summary_and_time_to_invoice() {
        let invoiced = cargo_with_history(
            "C1",
            &[
                (CargoStatus::AwaitingLoading, at(8, 0)),
                (CargoStatus::Invoiced, at(9, 30)),
            ],
        );
        let waiting = cargo_with_history("C2", &[(CargoStatus::AwaitingEntry, at(8, 0))]);
        let refs = vec![&invoiced, &waiting];

        let summary = summarize(&refs);
        assert_eq!(summary.total_cargos, 2);
        assert_eq!(summary.invoiced, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.completion_pct, 50.0);
        assert_eq!(avg_minutes_to_invoice(&refs), 90.0);
    }

    #[test]
    fn test_current_cycle_start_with_offset() {
        let config = KanbanConfig::default(); // 18:00, UTC-3
        // 本地 2026-03-02 20:00 (UTC 23:00) → 周期起点本地 18:00 = UTC 21:00
        assert_eq!(current_cycle_start(at(23, 0), &config), at(21, 0));
        // 本地 2026-03-02 10:00 (UTC 13:00) → 前一天本地 18:00
        assert_eq!(
            current_cycle_start(at(13, 0), &config),
            Utc.with_ymd_and_hms(2026, 3, 1, 21, 0, 0).unwrap()
        );
        // 恰好 18:00 本地 → 当前周期起点本身
        assert_eq!(current_cycle_start(at(21, 0), &config), at(21, 0));
    }

    #[test]
    fn test_cycles_bucket_by_dispatch_time() {
        let aggregator = ReportingAggregator::new(KanbanConfig {
            cycle_utc_offset_minutes: 0,
            cycle_window_count: 2,
            ..Default::default()
        });
        let today = cargo_with_history(
            "C1",
            &[
                (CargoStatus::AwaitingLoading, at(19, 0)),
                (CargoStatus::Invoiced, at(20, 0)),
            ],
        );
        let yesterday = cargo_with_history("C2", &[(CargoStatus::AwaitingEntry, at(17, 0))]);

        let cycles = aggregator.cycles(&[&today, &yesterday], at(22, 0));
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].dispatched, 1);
        assert_eq!(cycles[0].invoiced, 0);
        assert_eq!(cycles[1].start, at(18, 0));
        assert_eq!(cycles[1].invoiced, 1);
        assert_eq!(cycles[1].invoiced_tonnes, 10.0);
        assert_eq!(cycles[1].avg_minutes_per_tonne, 6.0);
        assert_eq!(cycles[1].efficiency_pct, 20.0);
    }
}
