//! Device listing parsers
//!
//! ffmpeg and the desktop tools print device lists as text. These helpers
//! turn that text into capture types; they never run processes themselves.

use crate::capture::traits::{AudioDevice, CameraDevice, CaptureSource, SourceGeometry};

/// Devices reported by `ffmpeg -f avfoundation -list_devices true -i ""`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AvFoundationDevices {
    pub screens: Vec<CaptureSource>,
    pub cameras: Vec<CameraDevice>,
    pub microphones: Vec<AudioDevice>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Video,
    Audio,
}

/// Strip the `[demuxer @ 0x...] ` log prefix ffmpeg puts on each line
fn strip_log_prefix(line: &str) -> &str {
    let line = line.trim();
    if line.starts_with('[') {
        if let Some(idx) = line.find("] ") {
            return line[idx + 2..].trim();
        }
    }
    line
}

/// Parse `[3] Some Name` into `(3, "Some Name")`
fn parse_indexed_entry(entry: &str) -> Option<(u32, &str)> {
    let rest = entry.strip_prefix('[')?;
    let (index, name) = rest.split_once(']')?;
    let index = index.trim().parse().ok()?;
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some((index, name))
    }
}

pub fn parse_avfoundation_devices(listing: &str) -> AvFoundationDevices {
    let mut devices = AvFoundationDevices::default();
    let mut section = Section::None;

    for line in listing.lines() {
        let entry = strip_log_prefix(line);
        if entry.contains("AVFoundation video devices") {
            section = Section::Video;
            continue;
        }
        if entry.contains("AVFoundation audio devices") {
            section = Section::Audio;
            continue;
        }
        let Some((index, name)) = parse_indexed_entry(entry) else {
            continue;
        };
        match section {
            Section::Video if name.starts_with("Capture screen") => {
                let ordinal = devices.screens.len();
                devices.screens.push(CaptureSource {
                    id: index.to_string(),
                    name: format!("Screen {}", ordinal + 1),
                    geometry: None,
                    is_primary: ordinal == 0,
                });
            }
            Section::Video => devices.cameras.push(CameraDevice {
                id: index.to_string(),
                label: name.to_string(),
            }),
            Section::Audio => devices.microphones.push(AudioDevice {
                id: index.to_string(),
                label: name.to_string(),
            }),
            Section::None => {}
        }
    }

    devices
}

/// Parse `ffmpeg -list_devices true -f dshow -i dummy`.
///
/// Handles both the `"Name" (video)` form and the older layout with
/// "DirectShow video devices" headers.
pub fn parse_dshow_devices(listing: &str) -> (Vec<CameraDevice>, Vec<AudioDevice>) {
    let mut cameras = Vec::new();
    let mut microphones = Vec::new();
    let mut section = Section::None;

    for line in listing.lines() {
        let entry = strip_log_prefix(line);
        if entry.contains("DirectShow video devices") {
            section = Section::Video;
            continue;
        }
        if entry.contains("DirectShow audio devices") {
            section = Section::Audio;
            continue;
        }
        if entry.starts_with("Alternative name") {
            continue;
        }
        let Some(rest) = entry.strip_prefix('"') else {
            continue;
        };
        let Some((name, suffix)) = rest.split_once('"') else {
            continue;
        };
        let kind = match suffix.trim() {
            "(video)" => Section::Video,
            "(audio)" => Section::Audio,
            "(none)" => continue,
            _ => section,
        };
        match kind {
            Section::Video => cameras.push(CameraDevice {
                id: name.to_string(),
                label: name.to_string(),
            }),
            Section::Audio => microphones.push(AudioDevice {
                id: name.to_string(),
                label: name.to_string(),
            }),
            Section::None => {}
        }
    }

    (cameras, microphones)
}

/// Parse `pactl list short sources`, skipping monitor (loopback) sources
pub fn parse_pactl_sources(listing: &str) -> Vec<AudioDevice> {
    listing
        .lines()
        .filter_map(|line| {
            let name = line.split('\t').nth(1)?.trim();
            if name.is_empty() || name.ends_with(".monitor") {
                return None;
            }
            Some(AudioDevice {
                id: name.to_string(),
                label: pactl_label(name),
            })
        })
        .collect()
}

/// `alsa_input.usb-Blue_Yeti-00.analog-stereo` -> `Blue Yeti (analog-stereo)`
fn pactl_label(name: &str) -> String {
    let Some(rest) = name.split_once('.').map(|(_, rest)| rest) else {
        return name.to_string();
    };
    let (device, profile) = rest.rsplit_once('.').unwrap_or((rest, ""));
    let device = device
        .trim_start_matches("usb-")
        .trim_start_matches("pci-")
        .trim_end_matches("-00")
        .replace('_', " ");
    if profile.is_empty() {
        device
    } else {
        format!("{} ({})", device, profile)
    }
}

/// Parse `xrandr --listmonitors` into one source per monitor on `display`
pub fn parse_xrandr_monitors(listing: &str, display: &str) -> Vec<CaptureSource> {
    listing
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let index = tokens.next()?.strip_suffix(':')?;
            index.parse::<u32>().ok()?;
            let flags_and_name = tokens.next()?;
            let geometry = parse_xrandr_geometry(tokens.next()?)?;
            let is_primary = flags_and_name.contains('*');
            let name = flags_and_name.trim_start_matches(['+', '*']);
            Some(CaptureSource {
                id: format!("{}+{},{}", display, geometry.x, geometry.y),
                name: name.to_string(),
                geometry: Some(geometry),
                is_primary,
            })
        })
        .collect()
}

/// `1920/344x1080/193+0+0` -> 1920x1080 at (0, 0)
fn parse_xrandr_geometry(token: &str) -> Option<SourceGeometry> {
    let (width_part, rest) = token.split_once('x')?;
    let width = width_part.split('/').next()?.parse().ok()?;
    let mut parts = rest.split('+');
    let height = parts.next()?.split('/').next()?.parse().ok()?;
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    Some(SourceGeometry {
        x,
        y,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVFOUNDATION: &str = "\
[AVFoundation indev @ 0x7f9b1c004d80] AVFoundation video devices:
[AVFoundation indev @ 0x7f9b1c004d80] [0] FaceTime HD Camera
[AVFoundation indev @ 0x7f9b1c004d80] [1] Capture screen 0
[AVFoundation indev @ 0x7f9b1c004d80] [2] Capture screen 1
[AVFoundation indev @ 0x7f9b1c004d80] AVFoundation audio devices:
[AVFoundation indev @ 0x7f9b1c004d80] [0] MacBook Pro Microphone
[AVFoundation indev @ 0x7f9b1c004d80] [1] Blue Yeti
: Input/output error";

    #[test]
    fn test_avfoundation_listing() {
        let devices = parse_avfoundation_devices(AVFOUNDATION);
        assert_eq!(devices.screens.len(), 2);
        assert_eq!(devices.screens[0].id, "1");
        assert_eq!(devices.screens[0].name, "Screen 1");
        assert!(devices.screens[0].is_primary);
        assert!(!devices.screens[1].is_primary);
        assert_eq!(devices.cameras.len(), 1);
        assert_eq!(devices.cameras[0].label, "FaceTime HD Camera");
        assert_eq!(devices.microphones.len(), 2);
        assert_eq!(devices.microphones[1].id, "1");
        assert_eq!(devices.microphones[1].label, "Blue Yeti");
    }

    #[test]
    fn test_dshow_listing_new_format() {
        let listing = r#"[dshow @ 000001b5] "Integrated Camera" (video)
[dshow @ 000001b5]   Alternative name "@device_pnp_\\?\usb#vid_04f2"
[dshow @ 000001b5] "Microphone Array (Realtek(R) Audio)" (audio)
[dshow @ 000001b5]   Alternative name "@device_cm_{33D9A762}\wave_{1}"
[dshow @ 000001b5] "OBS Virtual Camera" (none)"#;
        let (cameras, microphones) = parse_dshow_devices(listing);
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].id, "Integrated Camera");
        assert_eq!(microphones.len(), 1);
        assert_eq!(microphones[0].label, "Microphone Array (Realtek(R) Audio)");
    }

    #[test]
    fn test_dshow_listing_old_format() {
        let listing = r#"[dshow @ 02cec400] DirectShow video devices (some may be both video and audio devices)
[dshow @ 02cec400]  "USB2.0 Camera"
[dshow @ 02cec400] DirectShow audio devices
[dshow @ 02cec400]  "Microphone (USB Audio)"
"#;
        let (cameras, microphones) = parse_dshow_devices(listing);
        assert_eq!(cameras[0].id, "USB2.0 Camera");
        assert_eq!(microphones[0].id, "Microphone (USB Audio)");
    }

    #[test]
    fn test_pactl_skips_monitors() {
        let listing = "0\talsa_output.pci-0000_00_1f.3.analog-stereo.monitor\tmodule-alsa-card.c\ts16le 2ch 44100Hz\tSUSPENDED\n\
1\talsa_input.usb-Blue_Yeti-00.analog-stereo\tmodule-alsa-card.c\ts16le 2ch 48000Hz\tRUNNING\n";
        let devices = parse_pactl_sources(listing);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "alsa_input.usb-Blue_Yeti-00.analog-stereo");
        assert_eq!(devices[0].label, "Blue Yeti (analog-stereo)");
    }

    #[test]
    fn test_xrandr_monitors() {
        let listing = "Monitors: 2
 0: +*eDP-1 1920/344x1080/193+0+0  eDP-1
 1: +HDMI-1 2560/597x1440/336+1920+0  HDMI-1
";
        let sources = parse_xrandr_monitors(listing, ":0.0");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "eDP-1");
        assert!(sources[0].is_primary);
        assert_eq!(sources[0].id, ":0.0+0,0");
        assert_eq!(
            sources[1].geometry,
            Some(SourceGeometry {
                x: 1920,
                y: 0,
                width: 2560,
                height: 1440
            })
        );
        assert_eq!(sources[1].id, ":0.0+1920,0");
        assert!(!sources[1].is_primary);
    }

    #[test]
    fn test_empty_listings() {
        assert!(parse_xrandr_monitors("", ":0").is_empty());
        assert!(parse_pactl_sources("").is_empty());
        assert_eq!(parse_avfoundation_devices(""), AvFoundationDevices::default());
    }
}
