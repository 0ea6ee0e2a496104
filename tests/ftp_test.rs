use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ftpdu::{estimate, Connection, FtpConfig, FtpConnection, RemoteError};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// The served tree.
///
/// ```
/// /site/
///   a          100
///   b          200
///   c/
///     d         50
///   empty/     (answers NLST with "550 No files found")
///   q"uote/
/// ```
fn served_tree() -> (BTreeSet<String>, BTreeMap<String, u64>) {
    let dirs = ["/", "/site", "/site/c", "/site/empty", "/site/q\"uote"]
        .into_iter()
        .map(String::from)
        .collect();
    let files = [("/site/a", 100), ("/site/b", 200), ("/site/c/d", 50)]
        .into_iter()
        .map(|(p, s)| (p.to_string(), s))
        .collect();
    (dirs, files)
}

fn resolve(cwd: &str, arg: &str) -> String {
    let joined = if arg.starts_with('/') {
        arg.to_string()
    } else {
        format!("{cwd}/{arg}")
    };
    let mut parts: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            seg => parts.push(seg),
        }
    }
    format!("/{}", parts.join("/"))
}

fn send(out: &mut TcpStream, line: &str) {
    out.write_all(format!("{line}\r\n").as_bytes()).unwrap();
}

/// Serve one control connection on loopback. Returns the port and a handle
/// yielding every command line received.
fn spawn_server() -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (dirs, files) = served_tree();
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut out = stream;
        let mut cwd = "/".to_string();
        let mut pasv: Option<TcpListener> = None;
        let mut log = Vec::new();

        send(&mut out, "220-Welcome to the test server");
        send(&mut out, "220 Ready");

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            let line = line.trim_end().to_string();
            log.push(line.clone());
            let (cmd, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));

            match cmd {
                "USER" => send(&mut out, "331 Password required"),
                "PASS" if arg == "secret" => send(&mut out, "230 Logged in"),
                "PASS" => send(&mut out, "530 Login incorrect"),
                "TYPE" => send(&mut out, "200 Switching to Binary mode"),
                "PWD" => send(
                    &mut out,
                    &format!("257 \"{}\" is the current directory", cwd.replace('"', "\"\"")),
                ),
                "CWD" => {
                    let target = resolve(&cwd, arg);
                    if dirs.contains(&target) {
                        cwd = target;
                        send(&mut out, "250 Directory successfully changed");
                    } else {
                        send(&mut out, &format!("550 {arg}: No such file or directory"));
                    }
                }
                "SIZE" => {
                    let target = resolve(&cwd, arg);
                    match files.get(&target) {
                        Some(size) => send(&mut out, &format!("213 {size}")),
                        None if dirs.contains(&target) => {
                            send(&mut out, &format!("550 {arg}: not a regular file"))
                        }
                        None => send(&mut out, &format!("550 {arg}: No such file or directory")),
                    }
                }
                "PASV" => {
                    let data = TcpListener::bind("127.0.0.1:0").unwrap();
                    let p = data.local_addr().unwrap().port();
                    pasv = Some(data);
                    send(
                        &mut out,
                        &format!("227 Entering Passive Mode (127,0,0,1,{},{}).", p / 256, p % 256),
                    );
                }
                "NLST" => {
                    let data = pasv.take().unwrap();
                    if cwd == "/site/empty" {
                        send(&mut out, "550 No files found");
                        continue;
                    }
                    send(&mut out, "150 Here comes the directory listing");
                    let (mut conn, _) = data.accept().unwrap();
                    let prefix = if cwd == "/" { "/".to_string() } else { format!("{cwd}/") };
                    let children = dirs
                        .iter()
                        .map(String::as_str)
                        .chain(files.keys().map(String::as_str))
                        .filter_map(|p| p.strip_prefix(prefix.as_str()))
                        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                        .collect::<BTreeSet<_>>();
                    for child in children {
                        conn.write_all(format!("{child}\r\n").as_bytes()).unwrap();
                    }
                    drop(conn);
                    send(&mut out, "226 Directory send OK");
                }
                "QUIT" => {
                    send(&mut out, "221 Goodbye");
                    break;
                }
                _ => send(&mut out, "502 Command not implemented"),
            }
        }

        log
    });

    (port, handle)
}

fn connect(port: u16) -> FtpConnection {
    let config = FtpConfig {
        port,
        timeout: Some(Duration::from_secs(5)),
    };
    FtpConnection::connect("127.0.0.1", &config).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn estimates_a_tree_over_ftp() {
    let (port, server) = spawn_server();
    let mut ftp = connect(port);
    assert_eq!(ftp.welcome(), "Welcome to the test server\nReady");

    ftp.login("bob", "secret").unwrap();
    ftp.change_directory("site").unwrap();
    let parent = ftp.current_path().unwrap();
    assert_eq!(parent, "/site");

    let report = estimate().subtree(&mut ftp, "", &parent).unwrap();

    assert_eq!(report.total_bytes, 350);
    assert!(!report.is_approximate(), "an empty directory is not a problem");
    assert_eq!(ftp.current_path().unwrap(), "/site");

    ftp.close().unwrap();
    let log = server.join().unwrap();
    assert!(log.contains(&"TYPE I".to_string()));
    assert!(log.contains(&"CWD c".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("QUIT"));
}

#[test]
fn depth_limit_over_ftp() {
    let (port, server) = spawn_server();
    let mut ftp = connect(port);
    ftp.login("bob", "secret").unwrap();
    ftp.change_directory("/site").unwrap();

    let report = estimate()
        .max_depth(0)
        .skipping(["empty", "q\"uote"])
        .subtree(&mut ftp, "", "/site")
        .unwrap();

    assert_eq!(report.total_bytes, 300 + 50_000);

    ftp.close().unwrap();
    let log = server.join().unwrap();
    assert!(!log.iter().any(|l| l == "CWD c"));
}

#[test]
fn wrong_password_is_a_permission_error() {
    let (port, server) = spawn_server();
    let mut ftp = connect(port);

    match ftp.login("bob", "hunter2") {
        Err(RemoteError::Permission { code, .. }) => assert_eq!(code, 530),
        other => panic!("expected 530, got {other:?}"),
    }

    drop(ftp);
    server.join().unwrap();
}

#[test]
fn quoted_working_directory_is_unescaped() {
    let (port, server) = spawn_server();
    let mut ftp = connect(port);
    ftp.login("bob", "secret").unwrap();

    ftp.change_directory("/site/q\"uote").unwrap();
    assert_eq!(ftp.current_path().unwrap(), "/site/q\"uote");

    ftp.close().unwrap();
    server.join().unwrap();
}

#[test]
fn size_replies_map_to_errors() {
    let (port, server) = spawn_server();
    let mut ftp = connect(port);
    ftp.login("bob", "secret").unwrap();
    ftp.change_directory("/site").unwrap();

    assert_eq!(ftp.size_of("a").unwrap(), 100);
    match ftp.size_of("c") {
        Err(RemoteError::Permission { message, .. }) => {
            assert!(message.contains("not a regular file"))
        }
        other => panic!("expected a refusal, got {other:?}"),
    }
    assert!(ftp.change_directory("nowhere").is_err());
    assert!(
        ftp.size_of("bad\r\nDELE a").is_err(),
        "line breaks must not reach the server"
    );

    ftp.close().unwrap();
    let log = server.join().unwrap();
    assert!(!log.iter().any(|l| l.starts_with("DELE")));
}

#[test]
fn command_round_trips_do_not_stall() {
    let (port, server) = spawn_server();
    let mut ftp = connect(port);
    ftp.login("bob", "secret").unwrap();
    ftp.change_directory("/site").unwrap();

    // Each exchange is a few loopback round trips. A command line split
    // across two segments waits on the peer's delayed ACK every time.
    let started = Instant::now();
    for _ in 0..100 {
        assert_eq!(ftp.size_of("a").unwrap(), 100);
    }
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_secs(2), "100 SIZE commands took {elapsed:?}");

    ftp.close().unwrap();
    server.join().unwrap();
}
