use crate::utils::error::{BioremError, Result};
use crate::utils::monitor::{ResourceMonitor, ResourceSnapshot};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Validating,
    Parsing,
    LoadingReferences,
    MergingBiorempp,
    MergingHadeg,
    MergingKegg,
    MergingToxcsm,
    Analysing,
    Exporting,
    Done,
}

impl ProcessingStage {
    /// 進入此階段時的累計進度百分比
    pub fn percent(&self) -> u8 {
        match self {
            ProcessingStage::Validating => 0,
            ProcessingStage::Parsing => 5,
            ProcessingStage::LoadingReferences => 15,
            ProcessingStage::MergingBiorempp => 25,
            ProcessingStage::MergingHadeg => 40,
            ProcessingStage::MergingKegg => 55,
            ProcessingStage::MergingToxcsm => 70,
            ProcessingStage::Analysing => 80,
            ProcessingStage::Exporting => 90,
            ProcessingStage::Done => 100,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Validating => "Validating upload",
            ProcessingStage::Parsing => "Parsing samples",
            ProcessingStage::LoadingReferences => "Loading reference databases",
            ProcessingStage::MergingBiorempp => "Merging with BioRemPP",
            ProcessingStage::MergingHadeg => "Merging with HADEG",
            ProcessingStage::MergingKegg => "Merging with KEGG",
            ProcessingStage::MergingToxcsm => "Merging with ToxCSM",
            ProcessingStage::Analysing => "Running analyses",
            ProcessingStage::Exporting => "Exporting results",
            ProcessingStage::Done => "Done",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    pub percent: u8,
    pub elapsed: Duration,
    pub resources: Option<ResourceSnapshot>,
}

type Observer = Box<dyn Fn(&ProgressUpdate) + Send + Sync>;

pub struct ProgressTracker {
    current: Option<ProcessingStage>,
    stage_started: Instant,
    started: Instant,
    durations: Vec<(ProcessingStage, Duration)>,
    observers: Vec<Observer>,
    monitor: ResourceMonitor,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_monitoring(false)
    }

    pub fn with_monitoring(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            current: None,
            stage_started: now,
            started: now,
            durations: Vec::new(),
            observers: Vec::new(),
            monitor: ResourceMonitor::new(enabled),
        }
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(&ProgressUpdate) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current
    }

    pub fn percent(&self) -> u8 {
        self.current.map(|s| s.percent()).unwrap_or(0)
    }

    /// 已完成階段及其耗時
    pub fn stage_durations(&self) -> &[(ProcessingStage, Duration)] {
        &self.durations
    }

    /// 開始新一輪處理；保留訂閱者
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.current = None;
        self.durations.clear();
        self.stage_started = now;
        self.started = now;
    }

    /// 進入下一個階段；進度不可倒退
    pub fn advance(&mut self, stage: ProcessingStage) -> Result<()> {
        if let Some(current) = self.current {
            if stage < current {
                return Err(BioremError::ProcessingError {
                    message: format!(
                        "cannot move progress back from '{}' to '{}'",
                        current, stage
                    ),
                });
            }
            if stage == current {
                return Ok(());
            }
            self.durations.push((current, self.stage_started.elapsed()));
        }

        self.current = Some(stage);
        self.stage_started = Instant::now();

        let update = ProgressUpdate {
            stage,
            percent: stage.percent(),
            elapsed: self.started.elapsed(),
            resources: self.monitor.snapshot(),
        };

        tracing::info!("⏳ [{:>3}%] {}", update.percent, stage);
        if let Some(resources) = &update.resources {
            tracing::debug!(
                "📊 CPU: {:.1}%, Memory: {}MB, Peak: {}MB",
                resources.cpu_usage,
                resources.memory_usage_mb,
                resources.peak_memory_mb
            );
        }

        for observer in &self.observers {
            observer(&update);
        }

        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        self.advance(ProcessingStage::Done)?;
        tracing::info!("✅ Processing finished in {:?}", self.started.elapsed());
        Ok(())
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
