//! Integration tests for precache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::TempDir;

    /// Command with its config and store isolated in `temp`
    fn precache(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("precache");
        cmd.env_remove("PRECACHE_CONFIG")
            .env_remove("PRECACHE_STORE_DIR")
            .arg("--config")
            .arg(temp.path().join("config.toml"))
            .arg("--store-dir")
            .arg(temp.path().join("generations"));
        cmd
    }

    fn write_config(temp: &TempDir, origin: &str, generation: &str, assets: &[&str]) {
        let assets = assets
            .iter()
            .map(|a| format!("\"{}\"", a))
            .collect::<Vec<_>>()
            .join(", ");
        let config = format!(
            "[cache]\ngeneration = \"{generation}\"\nassets = [{assets}]\n\n\
             [interceptor]\norigin = \"{origin}\"\n"
        );
        std::fs::write(temp.path().join("config.toml"), config).unwrap();
    }

    /// Serve a fixed set of paths over HTTP/1.1; anything else is a 404
    fn serve(routes: &'static [(&'static str, &'static str)]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line == "\r\n" => break,
                        Ok(_) => {}
                    }
                }

                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = match routes.iter().find(|(p, _)| *p == path) {
                    Some((_, body)) => ("200 OK", *body),
                    None => ("404 Not Found", "missing"),
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        format!("http://{}", addr)
    }

    fn generations(temp: &TempDir) -> Vec<String> {
        let dir = temp.path().join("generations");
        if !dir.exists() {
            return Vec::new();
        }
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| !n.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("precache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("versioned offline cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("precache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("precache"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("my-pwa-cache-v1"));
    }

    #[test]
    fn config_init_writes_defaults_once() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Configuration initialized"));

        let written = std::fs::read_to_string(temp.path().join("config.toml")).unwrap();
        assert!(written.contains("my-pwa-cache-v1"));

        precache(&temp)
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[cache\n").unwrap();
        precache(&temp)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn list_empty() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .arg("list")
            .assert()
            .success()
            .stderr(predicate::str::contains("No cache generations"));
    }

    #[test]
    fn list_empty_json() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::diff("[]\n"));
    }

    #[test]
    fn activate_without_install_fails() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .arg("activate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cannot activate"))
            .stderr(predicate::str::contains("precache install"));
    }

    #[test]
    fn fetch_excluded_scheme_is_declined() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .args(["fetch", "chrome-extension://abcdef/popup.html"])
            .assert()
            .success()
            .stderr(predicate::str::contains("declined"));
    }

    #[test]
    fn fetch_rejects_relative_url() {
        let temp = TempDir::new().unwrap();
        precache(&temp)
            .args(["fetch", "app.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid URL"));
    }

    #[test]
    fn install_failure_leaves_no_generation() {
        static ROUTES: &[(&str, &str)] = &[("/", "<html>")];
        let origin = serve(ROUTES);
        let temp = TempDir::new().unwrap();
        write_config(&temp, &origin, "v1", &["/", "app.js"]);

        precache(&temp)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Precache failed for app.js"))
            .stderr(predicate::str::contains("404"));

        assert!(generations(&temp).is_empty());
    }

    #[test]
    fn install_activate_fetch_lifecycle() {
        static ROUTES: &[(&str, &str)] = &[
            ("/", "<html>"),
            ("/app.js", "console.log(1)"),
            ("/main.css", "body{}"),
        ];
        let origin = serve(ROUTES);
        let temp = TempDir::new().unwrap();

        write_config(&temp, &origin, "v1", &["/", "app.js"]);
        precache(&temp).arg("install").assert().success();
        precache(&temp).arg("activate").assert().success();

        let url = format!("{}/app.js", origin);
        precache(&temp)
            .args(["fetch", url.as_str()])
            .assert()
            .success()
            .stdout(predicate::str::diff("console.log(1)"))
            .stderr(predicate::str::contains("source: cache"));

        // Upgrade: v2 installs beside v1, activation reaps v1
        write_config(&temp, &origin, "v2", &["/", "app.js", "main.css"]);
        precache(&temp).arg("install").assert().success();
        assert_eq!(generations(&temp).len(), 2);

        precache(&temp)
            .arg("activate")
            .assert()
            .success()
            .stderr(predicate::str::contains("Activated generation v2"));
        assert_eq!(generations(&temp).len(), 1);

        precache(&temp)
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("v2\n"));
    }
}
