//! Human-readable rendering of analysis reports and live packets.

use std::fmt::Write;

use tpms_core::correlation::{Confidence, TemperatureVerdict};
use tpms_core::{AnalysisReport, DecodedPacket, PressureStatus, TemperatureStatus};

const RULE: &str = "==================================================";

pub fn pressure_label(status: PressureStatus) -> &'static str {
    match status {
        PressureStatus::Dormant => "Dormant (no pressure)",
        PressureStatus::Low => "Low pressure",
        PressureStatus::Normal => "Normal pressure",
        PressureStatus::High => "High pressure",
        PressureStatus::VeryHigh => "Very high pressure!",
    }
}

pub fn temperature_label(status: TemperatureStatus) -> &'static str {
    match status {
        TemperatureStatus::Freezing => "Freezing",
        TemperatureStatus::Cold => "Cold",
        TemperatureStatus::Normal => "Normal",
        TemperatureStatus::Hot => "Hot",
        TemperatureStatus::Overheating => "Overheating!",
    }
}

fn confidence_label(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::Likely => "LIKELY TEMPERATURE",
        Confidence::Possible => "POSSIBLE TEMPERATURE (with offset)",
        Confidence::Unlikely => "UNLIKELY TEMPERATURE",
    }
}

fn mark(ok: bool) -> &'static str {
    if ok { "ok" } else { "x" }
}

pub fn render_packet(packet: &DecodedPacket) -> String {
    let f = &packet.fields;
    let mut out = String::new();

    // writes into a String cannot fail
    let _ = writeln!(out, "DECODED TPMS DATA:");
    let _ = writeln!(out, "   Sensor ID: {} (0x{:02X})", f.sensor_id, f.sensor_id);
    let _ = writeln!(out, "   Pressure: {} PSI", f.pressure);
    let _ = writeln!(out, "   Temperature: {}°F", f.temperature);
    let _ = writeln!(
        out,
        "   Checksum: {}",
        if packet.checksum_valid { "Valid" } else { "Invalid" }
    );
    let _ = writeln!(out, "   Location: {}", packet.location);
    let _ = writeln!(out, "   Status: {}", pressure_label(packet.pressure_status));
    let _ = writeln!(
        out,
        "   Temp Status: {}",
        temperature_label(packet.temperature_status)
    );

    out
}

pub fn render_report(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Parsed {} packets", report.frame_count);
    if report.skipped_lines > 0 {
        let _ = writeln!(out, "Skipped {} malformed lines", report.skipped_lines);
    }

    let _ = writeln!(out, "\nPACKET STRUCTURE ANALYSIS\n{RULE}");
    for byte in &report.profile.positions {
        match byte.constant_value() {
            Some(value) => {
                let _ = writeln!(out, "Byte {}: CONSTANT = 0x{value:02X} ({value})", byte.position);
            }
            None => {
                let _ = writeln!(
                    out,
                    "Byte {}: VARIABLE - {} unique values",
                    byte.position,
                    byte.cardinality()
                );
                for (value, count) in byte.ranked() {
                    let _ = writeln!(out, "  0x{value:02X} ({value:3}) appears {count} times");
                }
            }
        }
    }

    let _ = writeln!(out, "\nCHECKSUM ANALYSIS\n{RULE}");
    for sample in &report.checksum_samples {
        let _ = writeln!(
            out,
            "Packet {}: Last byte = 0x{:02X}",
            sample.index + 1,
            sample.frame.trailer()
        );
        for result in &sample.results {
            let _ = writeln!(
                out,
                "  {:<16} 0x{:02X} {}",
                result.name,
                result.predicted,
                mark(result.matches)
            );
        }
    }
    for tally in &report.checksum_tallies {
        let _ = writeln!(
            out,
            "{:<16} {}/{} ({:.0}%)",
            tally.name,
            tally.matches,
            tally.total,
            tally.rate() * 100.0
        );
    }
    match report.best_checksum() {
        Some(best) => {
            let _ = writeln!(out, "Best hypothesis: {}", best.name);
        }
        None => {
            let _ = writeln!(out, "No checksum hypothesis matched");
        }
    }

    let _ = writeln!(out, "\nPACKET TYPES\n{RULE}");
    let _ = writeln!(out, "Found {} unique packet types:", report.distinct_frames());
    for (i, class) in report.profile.classes.iter().enumerate() {
        let _ = writeln!(out, "Type {}: {} (x{})", i + 1, class.frame, class.occurrences);
    }

    if !report.rejected.is_empty() {
        let _ = writeln!(out, "\nREJECTED FRAMES\n{RULE}");
        for rejected in &report.rejected {
            let _ = writeln!(
                out,
                "Packet {}: {} ({})",
                rejected.index + 1,
                rejected.frame,
                rejected.error
            );
        }
    }

    if let Some(correlation) = &report.correlation {
        let _ = writeln!(out, "\nTEMPERATURE CORRELATION ANALYSIS\n{RULE}");
        let _ = writeln!(out, "Actual ambient temperature: {}°F", correlation.reference);
        for sensor in &correlation.sensors {
            let _ = writeln!(
                out,
                "Sensor ID 0x{:02X} ({:2}): Value {:3} (Δ{:+.1}°F from ambient) {}",
                sensor.sensor_id,
                sensor.sensor_id,
                sensor.mean as i64,
                sensor.delta,
                confidence_label(sensor.confidence)
            );
        }
        let _ = writeln!(
            out,
            "Unique temperature values: {:?}",
            correlation.distinct_values
        );
        let _ = writeln!(
            out,
            "Values within ±15°F of ambient: {:?}",
            correlation.close_values
        );
        let _ = match correlation.verdict {
            TemperatureVerdict::Supported => {
                writeln!(out, "Byte 5 appears to contain temperature data in Fahrenheit")
            }
            TemperatureVerdict::Inconclusive => writeln!(out, "Temperature correlation unclear"),
        };
    }

    out
}
