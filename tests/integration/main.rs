//! Integration tests for geocache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// A command isolated from the user's config and cache
    fn geocache(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("geocache");
        cmd.env("GEOCACHE_CONFIG", temp.path().join("config.toml"))
            .env("GEOCACHE_CACHE_PATH", temp.path().join("cache.json"))
            .env_remove("GOOGLE_MAPS_API_KEY");
        for var in ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"] {
            cmd.env_remove(var);
        }
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("reverse geocoder"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("geocache"));
    }

    #[test]
    fn config_path_honors_env() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"))
            .stdout(predicate::str::contains(temp.path().to_string_lossy().as_ref()));
    }

    #[test]
    fn config_show_prints_sections() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("precision = 5"));
    }

    #[test]
    fn config_set_then_show() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .args(["config", "set", "cache.precision", "4"])
            .assert()
            .success();

        geocache(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("precision = 4"));
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .args(["config", "set", "nope.key", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn config_show_redacts_api_key() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .env("GOOGLE_MAPS_API_KEY", "super-secret")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("super-secret").not());
    }

    #[test]
    fn cache_path_honors_env() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cache.json"));
    }

    #[test]
    fn cache_list_empty() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("empty"));
    }

    #[test]
    fn cache_list_reads_persisted_entries() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("cache.json"),
            r#"{
                "version": 1,
                "precision": 5,
                "entries": [
                    {
                        "lat": 51.50072,
                        "lng": -0.12462,
                        "address": "Westminster, London SW1A 0AA, UK",
                        "resolved_at": "2024-03-01T12:00:00Z"
                    }
                ]
            }"#,
        )
        .unwrap();

        geocache(&temp)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("51.50072,-0.12462"))
            .stdout(predicate::str::contains("Westminster"));
    }

    #[test]
    fn cache_list_survives_corrupt_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("cache.json"), "{ not json").unwrap();

        geocache(&temp)
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn resolve_rejects_out_of_range_latitude() {
        let temp = TempDir::new().unwrap();
        geocache(&temp)
            .args(["resolve", "91", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid coordinate"));
    }

    #[test]
    fn resolve_accepts_negative_numbers() {
        let temp = TempDir::new().unwrap();
        // Valid coordinate, but no API key: fails on configuration, not parsing
        geocache(&temp)
            .args(["resolve", "-33.8688", "151.2093"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("API key"));
    }

    /// Local stand-in for the geocoding endpoint that counts requests
    struct MockEndpoint {
        url: String,
        hits: Arc<AtomicUsize>,
    }

    impl MockEndpoint {
        fn start(address: &str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let url = format!(
                "http://{}/maps/api/geocode/json",
                listener.local_addr().unwrap()
            );
            let body = format!(
                r#"{{"status":"OK","results":[{{"formatted_address":"{}"}}]}}"#,
                address
            );
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let hits = Arc::new(AtomicUsize::new(0));

            let counter = Arc::clone(&hits);
            std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { continue };
                    let Ok(read_half) = stream.try_clone() else { continue };
                    let mut reader = BufReader::new(read_half);
                    let mut line = String::new();
                    while reader.read_line(&mut line).is_ok_and(|n| n > 0) && line != "\r\n" {
                        line.clear();
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                    let _ = stream.write_all(response.as_bytes());
                }
            });

            Self { url, hits }
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    /// Point the isolated config at `endpoint` with a dummy key
    fn use_endpoint(temp: &TempDir, endpoint: &MockEndpoint) {
        std::fs::write(
            temp.path().join("config.toml"),
            format!(
                "[geocoder]\napi_key = \"test-key\"\nbase_url = \"{}\"\n",
                endpoint.url
            ),
        )
        .unwrap();
    }

    #[test]
    fn resolve_prints_address_and_persists_cache() {
        let temp = TempDir::new().unwrap();
        let endpoint = MockEndpoint::start("1600 Amphitheatre Pkwy, Mountain View, CA");
        use_endpoint(&temp, &endpoint);

        geocache(&temp)
            .args(["resolve", "37.4220", "-122.0841", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1600 Amphitheatre Pkwy"));

        assert_eq!(endpoint.hits(), 1);
        let saved = std::fs::read_to_string(temp.path().join("cache.json")).unwrap();
        assert!(saved.contains("1600 Amphitheatre Pkwy"));

        // Second run answers from the persisted cache
        geocache(&temp)
            .args(["resolve", "37.4220", "-122.0841", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"cached\": true"));
        assert_eq!(endpoint.hits(), 1);
    }

    #[test]
    fn batch_duplicates_share_one_request() {
        let temp = TempDir::new().unwrap();
        let endpoint = MockEndpoint::start("Pariser Platz, 10117 Berlin");
        use_endpoint(&temp, &endpoint);

        geocache(&temp)
            .args(["batch", "-o", "plain"])
            .write_stdin("52.5163,13.3777\n52.5163, 13.3777\n# again\n52.516301 13.377701\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Pariser Platz").count(3));

        assert_eq!(endpoint.hits(), 1);
        assert!(temp.path().join("cache.json").exists());
    }

    #[test]
    fn batch_reports_invalid_lines() {
        let temp = TempDir::new().unwrap();
        let endpoint = MockEndpoint::start("Null Island");
        use_endpoint(&temp, &endpoint);

        geocache(&temp)
            .args(["batch", "-o", "plain"])
            .write_stdin("0,0\n95,0\n")
            .assert()
            .failure()
            .stdout(predicate::str::contains("Null Island"))
            .stdout(predicate::str::contains("Invalid coordinate"))
            .stderr(predicate::str::contains("1 of 2"));

        assert_eq!(endpoint.hits(), 1);
    }

    #[test]
    fn invalid_subcommand() {
        let temp = TempDir::new().unwrap();
        geocache(&temp).arg("nonexistent").assert().failure();
    }
}
