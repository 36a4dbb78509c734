use anyhow::Result;
use vffr::audio::Microphone;
use vffr::session::SessionReport;

/// Comma-separated device names from `VFFR_TEST_DEVICES`.
pub(crate) fn parse_device_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub(crate) fn list_input_devices() -> Result<()> {
    let devices = match std::env::var("VFFR_TEST_DEVICES") {
        Ok(raw) => parse_device_list(&raw),
        Err(_) => Microphone::list_devices().unwrap_or_else(|err| {
            eprintln!("Failed to list audio input devices: {err}");
            Vec::new()
        }),
    };

    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

pub(crate) fn format_report(report: &SessionReport) -> String {
    format!(
        "Session {} complete for {} ({} trials, {} recall timeouts, {} recognition failures, seed {})",
        report.session,
        report.subject,
        report.trials,
        report.recall_timeouts,
        report.recognition_failures,
        report.seed
    )
}
