use anyhow::Result;
use ncabsentee::{
    config::{PipelineConfig, GROUP_COLUMNS},
    error::{AggregateError, ExtractError},
    pipeline::{run, run_from_archive, RunOutcome},
};
use reqwest::Client;
use std::{
    fs,
    io::{Cursor, Write},
    path::Path,
    time::Duration,
};
use tempfile::{tempdir, TempDir};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use zip::write::SimpleFileOptions;

fn zip_bytes(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default())?;
            zip.write_all(data)?;
        }
        zip.finish()?;
    }
    Ok(buf)
}

fn config_in(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        source_url: "http://127.0.0.1:9/unused.zip".into(),
        download_dir: dir.path().join("downloads"),
        output_path: dir.path().join("aggregated_absentee_summary.csv"),
        rate_limit: Duration::ZERO,
        ..PipelineConfig::default()
    }
}

/// Three absentee rows: two identical ACCEPTED ballots in WAKE, one REJECTED in DURHAM.
fn three_row_csv() -> String {
    let mut header: Vec<&str> = vec!["voter_reg_num"];
    header.extend(GROUP_COLUMNS.iter().copied());
    let wake = [
        "WAKE", "W", "NL", "F", "34", "DEM", "CONGRESSIONAL DISTRICT 2", "NC HOUSE DISTRICT 35",
        "NC SENATE DISTRICT 18", "MAIL", "CIV", "09/20/2024", "09/24/2024", "10/01/2024",
        "ACCEPTED",
    ];
    let mut durham = wake;
    durham[0] = "DURHAM";
    durham[14] = "REJECTED";

    let mut csv = format!("{}\n", header.join(" , "));
    csv.push_str(&format!("000001, {}\n", wake.join(",")));
    csv.push_str(&format!("000002,{} \n", wake.join(" ,")));
    csv.push_str(&format!("000003,{}\n", durham.join(",")));
    csv
}

fn write_archive(dir: &Path, entries: &[(&str, &[u8])]) -> Result<std::path::PathBuf> {
    let path = dir.join("absentee_20241105.zip");
    fs::write(&path, zip_bytes(entries)?)?;
    Ok(path)
}

#[tokio::test]
async fn three_rows_aggregate_into_two_groups() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(&tmp);
    let csv = three_row_csv();
    let zip_path = write_archive(
        tmp.path(),
        &[("readme.txt", b"layout"), ("absentee_20241105.csv", csv.as_bytes())],
    )?;

    let outcome = run_from_archive(&zip_path, &config).await?;

    let report = match outcome {
        RunOutcome::Written(report) => report,
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert_eq!(report.rows, 3);
    assert_eq!(report.accepted, 2);
    assert_eq!(report.groups, 2);
    assert!(config.download_dir.join("absentee_20241105.csv").exists());
    assert!(!config.download_dir.join("readme.txt").exists());

    let mut rdr = csv::Reader::from_path(&config.output_path)?;
    let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut expected_header: Vec<String> = GROUP_COLUMNS.iter().map(|c| c.to_string()).collect();
    expected_header.push("ballot_count".into());
    assert_eq!(header, expected_header);

    let rows: Vec<csv::StringRecord> = rdr.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 2);
    let count_for = |county: &str| {
        rows.iter()
            .find(|r| &r[0] == county)
            .map(|r| r[15].to_string())
    };
    assert_eq!(count_for("WAKE").as_deref(), Some("2"));
    assert_eq!(count_for("DURHAM").as_deref(), Some("1"));
    assert_eq!(&rows[0][14], "REJECTED");
    Ok(())
}

#[tokio::test]
async fn malformed_csv_ends_run_without_output() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(&tmp);
    let zip_path = write_archive(
        tmp.path(),
        &[("absentee.csv", b"county_desc,age\nWAKE,34\n\x00\xff,\x01,PK\x03\x04\n")],
    )?;

    let outcome = run_from_archive(&zip_path, &config).await?;

    assert!(matches!(outcome, RunOutcome::ParseFailed { .. }));
    assert!(!config.output_path.exists());
    Ok(())
}

#[tokio::test]
async fn truncated_csv_ends_run_without_output() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(&tmp);
    let full = three_row_csv();
    let cut = full.rfind("DURHAM").unwrap();
    let truncated = format!("{}\"DURHAM,W,NL", &full[..cut]);
    let zip_path = write_archive(tmp.path(), &[("absentee.csv", truncated.as_bytes())])?;

    let outcome = run_from_archive(&zip_path, &config).await?;

    match outcome {
        RunOutcome::ParseFailed { reason, .. } => assert!(reason.contains("EOF inside quoted field")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!config.output_path.exists());
    Ok(())
}

#[tokio::test]
async fn header_only_csv_ends_run_without_output() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(&tmp);
    let header = GROUP_COLUMNS.join(",");
    let zip_path = write_archive(tmp.path(), &[("absentee.csv", header.as_bytes())])?;

    let outcome = run_from_archive(&zip_path, &config).await?;

    assert!(matches!(outcome, RunOutcome::NoRecords { .. }));
    assert!(!config.output_path.exists());
    Ok(())
}

#[tokio::test]
async fn archive_without_csv_aborts() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(&tmp);
    let zip_path = write_archive(tmp.path(), &[("absentee.txt", b"not a csv")])?;

    let err = run_from_archive(&zip_path, &config).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ExtractError>(),
        Some(ExtractError::NoCsvEntry(_))
    ));
    assert!(!config.output_path.exists());
    Ok(())
}

#[tokio::test]
async fn missing_key_column_aborts() -> Result<()> {
    let tmp = tempdir()?;
    let config = config_in(&tmp);
    let zip_path = write_archive(
        tmp.path(),
        &[("absentee.csv", b"county_desc,ballot_rtn_status\nWAKE,ACCEPTED\n")],
    )?;

    let err = run_from_archive(&zip_path, &config).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AggregateError>(),
        Some(AggregateError::MissingColumn(c)) if c == "race"
    ));
    assert!(!config.output_path.exists());
    Ok(())
}

#[tokio::test]
async fn run_downloads_then_aggregates() -> Result<()> {
    let tmp = tempdir()?;
    let body = zip_bytes(&[("absentee_20241105.csv", three_row_csv().as_bytes())])?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Ok((mut sock, _)) = listener.accept().await {
            let mut req = vec![0u8; 4096];
            let _ = sock.read(&mut req).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = sock.write_all(head.as_bytes()).await;
            let _ = sock.write_all(&body).await;
            let _ = sock.shutdown().await;
        }
    });

    let config = PipelineConfig {
        source_url: format!("http://{}/ENRS/2024_11_05/absentee_20241105.zip", addr),
        ..config_in(&tmp)
    };

    let outcome = run(&Client::new(), &config).await?;

    assert!(matches!(outcome, RunOutcome::Written(ref r) if r.groups == 2 && r.accepted == 2));
    assert!(config.download_dir.join("absentee_20241105.zip").exists());
    assert!(config.output_path.exists());
    Ok(())
}
