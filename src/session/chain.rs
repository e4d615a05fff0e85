//! Builds the interceptor chain a session runs from [`AppConfig`].
//!
//! | # | Stage | Present when |
//! |---|-------|--------------|
//! | 1 | [`LoggingInterceptor`] | always |
//! | 2 | [`ResumableInterceptor`] | `session.resumable` |
//! | 3 | [`FileLogInterceptor`] | `output.log_file` is set |
//! | 4 | [`TextSinkInterceptor`] (stdout) | `output.stdout` |
//! | 5 | [`DisplayInterceptor`] | a display is supplied |

use std::sync::Arc;

use crate::config::AppConfig;
use crate::display::DisplaySurface;
use crate::intercept::{
    CsvFileLog, DisplayInterceptor, FileLogInterceptor, InterceptorChain, LoggingInterceptor,
    ResumableInterceptor, TextSinkInterceptor,
};

pub fn build_chain(config: &AppConfig, display: Option<Arc<dyn DisplaySurface>>) -> InterceptorChain {
    let mut chain =
        InterceptorChain::new().with(LoggingInterceptor::from_level_name(&config.session.log_level));

    if config.session.resumable {
        chain.push(ResumableInterceptor::new(config.session.accumulate_keys.iter().cloned()));
    }
    if let Some(path) = &config.output.log_file {
        chain.push(FileLogInterceptor::new(CsvFileLog::new(path)));
    }
    if config.output.stdout {
        chain.push(TextSinkInterceptor::stdout(config.output.format.build(false)));
    }
    if let Some(display) = display {
        chain.push(DisplayInterceptor::new(display));
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::RecordingDisplay;
    use crate::update::Update;

    #[test]
    fn default_config_only_logs() {
        let chain = build_chain(&AppConfig::default(), None);
        assert_eq!(chain.stage_names(), vec!["logging"]);
    }

    #[test]
    fn full_config_keeps_stage_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.session.resumable = true;
        config.output.log_file = Some(dir.path().join("log.csv"));
        config.output.stdout = true;

        let display: Arc<dyn DisplaySurface> = Arc::new(RecordingDisplay::default());
        let chain = build_chain(&config, Some(display));
        assert_eq!(
            chain.stage_names(),
            vec!["logging", "resumable", "file_log", "text_sink", "display"]
        );
    }

    #[test]
    fn file_log_sees_accumulated_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut config = AppConfig::default();
        config.session.resumable = true;
        config.output.log_file = Some(path.clone());

        let mut chain = build_chain(&config, None);
        let ts = chrono::NaiveDate::from_ymd_opt(2012, 12, 21)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        for raw in [0, 10, 0, 5] {
            chain.dispatch(Update::new(ts, "distance_total", raw)).unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        let logged: Vec<&str> = text.lines().map(|l| l.rsplit(',').next().unwrap()).collect();
        assert_eq!(logged, vec!["0", "10", "15"]);
    }
}
