//! Encode plan construction.
//!
//! An [`EncodePlan`] is the immutable recipe for one batch run: the
//! ffmpeg argument list, the output name suffix, and whether the
//! suffix replaces the input extension (audio extraction) or is
//! appended to the stem (video re-encodes).

use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

/// Extensions accepted as video inputs.
pub const VIDEO_EXTS: &[&str] = &[
    "mp4", "mov", "mkv", "avi", "flv", "wmv", "m4v", "ts", "webm",
];

/// Errors from plan construction.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// The mode selector was not recognized.
    #[error("unknown encode mode: {0}")]
    InvalidMode(String),
}

/// Processing strategy selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    /// Quality-preserving re-encode (CRF 18, preset slow, audio copy).
    Quality,
    /// Size-optimized re-encode (CRF 28, preset veryslow, AAC 128k).
    Size,
    /// Audio extraction to .m4a (AAC 128k).
    AudioOnly,
}

impl FromStr for EncodeMode {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quality" => Ok(Self::Quality),
            "size" => Ok(Self::Size),
            "audio" | "audio-only" => Ok(Self::AudioOnly),
            other => Err(PlanError::InvalidMode(other.to_string())),
        }
    }
}

/// Immutable encode recipe for one run.
#[derive(Debug, Clone)]
pub struct EncodePlan {
    /// Codec/quality/filter arguments passed to ffmpeg between the
    /// input and output paths.
    pub args: Vec<String>,
    /// Output name suffix (`_hq.mp4`) or replacement extension (`.m4a`).
    pub out_suffix: String,
    /// Replace the input extension instead of appending to the stem.
    pub replace_ext: bool,
}

impl EncodePlan {
    /// Whether this plan produces video output (and is therefore
    /// eligible for the resolution cap).
    pub fn is_video(&self) -> bool {
        !self.replace_ext
    }
}

/// Build the canonical plan for a mode.
pub fn build_plan(mode: EncodeMode) -> EncodePlan {
    match mode {
        EncodeMode::Quality => EncodePlan {
            args: args(&[
                "-c:v", "libx264", "-crf", "18", "-preset", "slow",
                "-c:a", "copy", "-movflags", "+faststart",
            ]),
            out_suffix: "_hq.mp4".to_string(),
            replace_ext: false,
        },
        EncodeMode::Size => EncodePlan {
            args: args(&[
                "-c:v", "libx264", "-crf", "28", "-preset", "veryslow",
                "-c:a", "aac", "-b:a", "128k", "-movflags", "+faststart",
            ]),
            out_suffix: "_small.mp4".to_string(),
            replace_ext: false,
        },
        EncodeMode::AudioOnly => EncodePlan {
            args: args(&["-vn", "-acodec", "aac", "-b:a", "128k"]),
            out_suffix: ".m4a".to_string(),
            replace_ext: true,
        },
    }
}

/// Add a downscale filter when the probed height exceeds `cap`.
///
/// ffmpeg rejects a second `-vf` flag, so if the argument list already
/// carries one the scale expression is appended to its value with a
/// comma instead of adding a duplicate flag.
pub fn apply_resolution_cap(args: &mut Vec<String>, probed_height: Option<u32>, cap: u32) {
    let Some(height) = probed_height else {
        return;
    };
    if height <= cap {
        return;
    }

    let scale = format!("scale=-2:{}", cap);
    if let Some(pos) = args.iter().position(|a| a == "-vf") {
        if let Some(value) = args.get_mut(pos + 1) {
            value.push(',');
            value.push_str(&scale);
            return;
        }
    }
    args.push("-vf".to_string());
    args.push(scale);
}

/// Check a path against the accepted video extension set.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_ascii_lowercase();
            VIDEO_EXTS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_known_selectors() {
        assert_eq!("quality".parse::<EncodeMode>().unwrap(), EncodeMode::Quality);
        assert_eq!("size".parse::<EncodeMode>().unwrap(), EncodeMode::Size);
        assert_eq!("audio".parse::<EncodeMode>().unwrap(), EncodeMode::AudioOnly);
    }

    #[test]
    fn mode_rejects_unknown_selector() {
        let err = "turbo".parse::<EncodeMode>().unwrap_err();
        assert_eq!(err, PlanError::InvalidMode("turbo".to_string()));
    }

    #[test]
    fn audio_plan_replaces_extension() {
        let plan = build_plan(EncodeMode::AudioOnly);
        assert!(plan.replace_ext);
        assert_eq!(plan.out_suffix, ".m4a");
        assert!(!plan.is_video());
    }

    #[test]
    fn video_plans_append_suffix() {
        for mode in [EncodeMode::Quality, EncodeMode::Size] {
            let plan = build_plan(mode);
            assert!(!plan.replace_ext);
            assert!(plan.is_video());
            assert!(plan.out_suffix.ends_with(".mp4"));
        }
    }

    #[test]
    fn cap_adds_filter_above_threshold() {
        let mut args = build_plan(EncodeMode::Quality).args;
        apply_resolution_cap(&mut args, Some(1440), 1080);

        let pos = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[pos + 1], "scale=-2:1080");
    }

    #[test]
    fn cap_skips_at_or_below_threshold() {
        let mut args = build_plan(EncodeMode::Quality).args;
        let before = args.clone();

        apply_resolution_cap(&mut args, Some(1080), 1080);
        assert_eq!(args, before);

        apply_resolution_cap(&mut args, None, 1080);
        assert_eq!(args, before);
    }

    #[test]
    fn cap_merges_into_existing_filter() {
        let mut args = vec!["-vf".to_string(), "yadif".to_string()];
        apply_resolution_cap(&mut args, Some(2160), 1080);

        assert_eq!(args, vec!["-vf", "yadif,scale=-2:1080"]);
        assert_eq!(args.iter().filter(|a| *a == "-vf").count(), 1);
    }

    #[test]
    fn video_extension_filter() {
        assert!(is_video_file(Path::new("clip.mp4")));
        assert!(is_video_file(Path::new("clip.MKV")));
        assert!(!is_video_file(Path::new("notes.txt")));
        assert!(!is_video_file(Path::new("noext")));
    }
}
