use crate::messages::{AppCommand, ScanEvent, Symbology};
use anyhow::{Context, Result};
use std::io::BufRead;
use tokio::sync::mpsc;

/// Parse one line from the decoder feed
///
/// `QR:<value>` / `CODE128:<value>` carry the symbology; a line without a known
/// prefix is a scan of unknown symbology. Lines starting with `!` are user
/// actions. Returns `None` for empty lines and unknown actions.
pub fn parse_line(line: &str) -> Option<AppCommand> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(action) = line.trim().strip_prefix('!') {
        return match action.trim().to_ascii_lowercase().as_str() {
            "cancel" => Some(AppCommand::Cancel),
            "undo" => Some(AppCommand::Undo),
            "export" => Some(AppCommand::Export),
            "start" => Some(AppCommand::StartScanning),
            "stop" => Some(AppCommand::StopScanning),
            "quit" | "exit" => Some(AppCommand::Shutdown),
            other => {
                tracing::warn!("Unknown action: !{}", other);
                None
            }
        };
    }

    if line.trim().is_empty() {
        return None;
    }

    let event = match line.split_once(':') {
        Some((prefix, value)) => match prefix.parse::<Symbology>() {
            Ok(Symbology::Other) | Err(_) => ScanEvent::new(line, Symbology::Other),
            Ok(symbology) => ScanEvent::new(value, symbology),
        },
        None => ScanEvent::new(line, Symbology::Other),
    };

    Some(AppCommand::Scan(event))
}

/// Forward decoded scans and actions from `reader` until EOF, then request shutdown.
///
/// Blocks the calling thread; must not run on an async worker.
pub fn forward_lines<R: BufRead>(reader: R, tx: &mpsc::Sender<AppCommand>) -> Result<()> {
    for line in reader.lines() {
        let line = line.context("Failed to read scan input")?;
        if let Some(cmd) = parse_line(&line) {
            tracing::debug!("Input: {:?}", cmd);
            if tx.blocking_send(cmd).is_err() {
                return Ok(());
            }
        }
    }

    tracing::info!("Scan input closed");
    let _ = tx.blocking_send(AppCommand::Shutdown);
    Ok(())
}

/// Read scans from stdin on a detached thread; a pending read does not block
/// runtime shutdown.
pub fn monitor_stdin(tx: mpsc::Sender<AppCommand>) {
    std::thread::spawn(move || {
        if let Err(e) = forward_lines(std::io::stdin().lock(), &tx) {
            tracing::error!("Scan input failed: {:#}", e);
            let _ = tx.blocking_send(AppCommand::Shutdown);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(value: &str, symbology: Symbology) -> Option<AppCommand> {
        Some(AppCommand::Scan(ScanEvent::new(value, symbology)))
    }

    #[test]
    fn test_symbology_prefixes() {
        assert_eq!(parse_line("QR:ID-001"), scan("ID-001", Symbology::Qr));
        assert_eq!(parse_line("qrcode:ID-001"), scan("ID-001", Symbology::Qr));
        assert_eq!(parse_line("CODE128:PC-777"), scan("PC-777", Symbology::Code128));
        assert_eq!(parse_line("c128:PC-777\r"), scan("PC-777", Symbology::Code128));
        assert_eq!(parse_line("Code-128:PC-777"), scan("PC-777", Symbology::Code128));
    }

    #[test]
    fn test_value_may_contain_colons() {
        assert_eq!(
            parse_line("QR:https://example.com/item/1"),
            scan("https://example.com/item/1", Symbology::Qr)
        );
    }

    #[test]
    fn test_unknown_prefix_is_other() {
        assert_eq!(parse_line("EAN13:4006381333931"), scan("EAN13:4006381333931", Symbology::Other));
        assert_eq!(parse_line("4006381333931"), scan("4006381333931", Symbology::Other));
    }

    #[test]
    fn test_blank_value_is_forwarded() {
        // Blank filtering belongs to the workflow
        assert_eq!(parse_line("QR:   "), scan("   ", Symbology::Qr));
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn test_actions() {
        assert_eq!(parse_line("!cancel"), Some(AppCommand::Cancel));
        assert_eq!(parse_line("!UNDO"), Some(AppCommand::Undo));
        assert_eq!(parse_line(" !export "), Some(AppCommand::Export));
        assert_eq!(parse_line("!stop"), Some(AppCommand::StopScanning));
        assert_eq!(parse_line("!start"), Some(AppCommand::StartScanning));
        assert_eq!(parse_line("!quit"), Some(AppCommand::Shutdown));
        assert_eq!(parse_line("!bogus"), None);
    }

    #[tokio::test]
    async fn test_forward_lines_sends_shutdown_at_eof() {
        let input: &[u8] = b"QR:ID-001\n\nCODE128:PC-777\n!export\n";
        let (tx, mut rx) = mpsc::channel(10);

        tokio::task::spawn_blocking(move || forward_lines(input, &tx))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(rx.recv().await, scan("ID-001", Symbology::Qr));
        assert_eq!(rx.recv().await, scan("PC-777", Symbology::Code128));
        assert_eq!(rx.recv().await, Some(AppCommand::Export));
        assert_eq!(rx.recv().await, Some(AppCommand::Shutdown));
        assert_eq!(rx.recv().await, None);
    }
}
