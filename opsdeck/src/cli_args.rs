use clap::{Parser, ValueEnum};
use opsdeck_common::FilterBucket;

/// OpsDeck
///
/// Terminal dashboard for event operations. Shows the activity feed and
/// backup coverage panels once, or keeps them live until Ctrl-C.
/// In live mode, press Enter to refresh immediately.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[clap(name = "opsdeck")]
pub struct CliArgs {
    /// Which panels to show
    #[clap(value_enum, default_value_t = Mode::Ops)]
    pub mode: Mode,

    /// Refresh once, print, and exit
    #[clap(long = "once")]
    pub once: bool,

    /// Scope the activity feed to one event
    #[clap(long = "event", value_name = "ID")]
    pub event: Option<u64>,

    /// Activity category filter (all, media, issue, backup, user)
    #[clap(long = "filter", value_name = "BUCKET", default_value_t = FilterBucket::All)]
    pub filter: FilterBucket,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Activity feed only
    Activity,
    /// Backup coverage only
    Backups,
    /// Both panels
    Ops,
}

impl Mode {
    pub fn shows_activity(self) -> bool {
        matches!(self, Mode::Activity | Mode::Ops)
    }

    pub fn shows_backups(self) -> bool {
        matches!(self, Mode::Backups | Mode::Ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("opsdeck").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_defaults() {
        let parsed = parse(&[]).unwrap();
        assert_eq!(parsed.mode, Mode::Ops);
        assert!(!parsed.once);
        assert_eq!(parsed.event, None);
        assert_eq!(parsed.filter, FilterBucket::All);
    }

    #[test]
    fn test_parse_full_command() {
        let parsed = parse(&["activity", "--once", "--event", "12", "--filter", "Issue"]).unwrap();
        assert_eq!(parsed.mode, Mode::Activity);
        assert!(parsed.once);
        assert_eq!(parsed.event, Some(12));
        assert_eq!(parsed.filter, FilterBucket::Issue);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse(&["--event"]).is_err());
        assert!(parse(&["--event", "twelve"]).is_err());
        assert!(parse(&["--filter", "disks"]).is_err());
        assert!(parse(&["backups", "ops"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn test_help_is_handled_by_clap() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_mode_panels() {
        assert!(Mode::Ops.shows_activity() && Mode::Ops.shows_backups());
        assert!(Mode::Activity.shows_activity() && !Mode::Activity.shows_backups());
        assert!(!Mode::Backups.shows_activity() && Mode::Backups.shows_backups());
    }

    #[test]
    fn test_command_definition_is_valid() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}
