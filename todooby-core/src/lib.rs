//! todooby-core: calendar-aware subtask scheduling for AI-decomposed tasks.

pub mod analysis;
pub mod budget;
pub mod config;
pub mod error;
pub mod interval;
pub mod placer;
pub mod scheduler;
pub mod slots;
pub mod task;
pub mod time;

pub use analysis::{
    AnalysisRequest, AnalyzedTask, Complexity, DifficultyLevel, IdGenerator, SchedulingStatus,
    StampedIds, TaskAnalysis, TaskAnalyzer, analyze_task, fallback_analysis,
    parse_analysis_response,
};
pub use budget::{candidate_days_between, target_minutes_today};
pub use config::{DEFAULT_TIMEZONE, ScheduleConfig, TimeRange, UserSchedule};
pub use error::{AnalysisError, ScheduleError};
pub use interval::{Interval, merge_intervals, subtract_busy_from_working};
pub use placer::{DayPlacement, Placement, place_on_date};
pub use scheduler::{
    MAX_SCHEDULE_DAYS, ScheduleOutcome, Scheduler, SchedulingResult, schedule_or_keep,
    schedule_subtasks,
};
pub use slots::build_day_slots;
pub use task::{Priority, Subtask};
