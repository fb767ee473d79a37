//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use corvid_config::Patch;
use corvid_core::ChannelId;
use std::path::Path;

/// Parse a `channel=volts` string for clap's `value_parser`.
pub fn parse_channel_volts(s: &str) -> Result<(usize, f32), String> {
    let Some((channel, volts)) = s.split_once('=') else {
        return Err(format!(
            "Invalid input format: '{s}' (expected channel=volts)"
        ));
    };
    let channel: usize = channel
        .trim()
        .parse()
        .map_err(|_| format!("Invalid channel '{channel}' in '{s}'"))?;
    ChannelId::new(channel).map_err(|e| e.to_string())?;
    let volts: f32 = volts
        .trim()
        .parse()
        .map_err(|_| format!("Invalid voltage '{volts}' in '{s}'"))?;
    if !volts.is_finite() {
        return Err(format!("Voltage in '{s}' must be finite"));
    }
    Ok((channel, volts))
}

/// Load a patch file, naming the path on failure.
pub fn load_patch(path: &Path) -> anyhow::Result<Patch> {
    Patch::load(path).with_context(|| format!("loading patch {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_channel_volts() {
        assert_eq!(parse_channel_volts("3=2.5"), Ok((3, 2.5)));
        assert_eq!(parse_channel_volts(" 8 = -1 "), Ok((8, -1.0)));
    }

    #[test]
    fn rejects_bad_channel_volts() {
        assert!(parse_channel_volts("3").is_err());
        assert!(parse_channel_volts("9=1.0").is_err());
        assert!(parse_channel_volts("0=1.0").is_err());
        assert!(parse_channel_volts("x=1.0").is_err());
        assert!(parse_channel_volts("1=inf").is_err());
    }
}
