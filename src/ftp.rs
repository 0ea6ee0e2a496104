use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::RemoteError;
use crate::traits::Connection;

pub const DEFAULT_FTP_PORT: u16 = 21;

/// Transport settings for [`FtpConnection`].
#[derive(Debug, Clone)]
pub struct FtpConfig {
    pub port: u16,

    /// Read/write timeout on the control and data sockets, and the connect
    /// timeout. `None` blocks indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            port:    DEFAULT_FTP_PORT,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// One reply on the control connection. Multi-line text is joined with `\n`.
#[derive(Debug)]
struct Reply {
    code: u16,
    text: String,
}

/// A blocking FTP session, usable as a [`Connection`].
///
/// Implements just what an estimate needs: login, CWD, PWD, SIZE, and NLST
/// over a passive data connection. Permanent negative replies (5xx) become
/// [`RemoteError::Permission`], transient ones (4xx)
/// [`RemoteError::Transient`].
pub struct FtpConnection {
    reader:  BufReader<TcpStream>,
    writer:  TcpStream,
    welcome: String,
    timeout: Option<Duration>,
}

impl FtpConnection {
    /// Open the control connection and read the server greeting.
    pub fn connect(host: &str, config: &FtpConfig) -> Result<Self, RemoteError> {
        let addr = (host, config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                RemoteError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{host}: no address found"),
                ))
            })?;

        let stream = open(addr, config.timeout)?;
        let writer = stream.try_clone()?;
        let mut conn = Self {
            reader: BufReader::new(stream),
            writer,
            welcome: String::new(),
            timeout: config.timeout,
        };

        let greeting = check(conn.read_reply()?, &[220])?;
        conn.welcome = greeting.text;
        info!(host, port = config.port, "connected");
        Ok(conn)
    }

    /// Connect on the default port and log in.
    pub fn connect_and_login(host: &str, user: &str, pass: &str) -> Result<Self, RemoteError> {
        let mut conn = Self::connect(host, &FtpConfig::default())?;
        conn.login(user, pass)?;
        Ok(conn)
    }

    /// The server's greeting text.
    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    /// Authenticate, then switch to binary mode so SIZE reports byte counts
    /// (several servers refuse SIZE in ASCII mode).
    pub fn login(&mut self, user: &str, pass: &str) -> Result<(), RemoteError> {
        let reply = self.command(&format!("USER {user}"))?;
        match reply.code {
            230 => {}
            331 | 332 => {
                check(self.command(&format!("PASS {pass}"))?, &[202, 230])?;
            }
            _ => return Err(reject(reply)),
        }
        info!(user, "logged in");

        check(self.command("TYPE I")?, &[200])?;
        Ok(())
    }

    // ── Control channel ───────────────────────────────────────────────────

    fn command(&mut self, cmd: &str) -> Result<Reply, RemoteError> {
        if cmd.contains(&['\r', '\n'][..]) {
            return Err(RemoteError::Protocol(format!("line break in command {cmd:?}")));
        }

        if cmd.starts_with("PASS ") {
            debug!("> PASS ****");
        } else {
            debug!("> {cmd}");
        }

        // One write per line: a split line stalls on Nagle + delayed ACK
        self.writer.write_all(format!("{cmd}\r\n").as_bytes())?;
        self.writer.flush()?;

        let reply = self.read_reply()?;
        debug!("< {} {}", reply.code, reply.text);
        Ok(reply)
    }

    fn read_reply(&mut self) -> Result<Reply, RemoteError> {
        let first = self.read_line()?;
        let code = parse_code(&first)?;
        let mut text = first.get(4..).unwrap_or("").to_string();

        // Multi-line: "123-first" ... "123 last"
        if first.as_bytes().get(3) == Some(&b'-') {
            let code_str = code.to_string();
            let last = format!("{code} ");
            let cont = format!("{code}-");
            loop {
                let line = self.read_line()?;
                text.push('\n');
                if line.starts_with(&last) || line == code_str {
                    text.push_str(line.get(4..).unwrap_or(""));
                    break;
                }
                text.push_str(line.strip_prefix(&cont).unwrap_or(&line));
            }
        }

        Ok(Reply { code, text })
    }

    fn read_line(&mut self) -> Result<String, RemoteError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(RemoteError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "control connection closed",
            )));
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }

    // ── Data channel ──────────────────────────────────────────────────────

    fn passive(&mut self) -> Result<TcpStream, RemoteError> {
        let reply = check(self.command("PASV")?, &[227])?;
        let mut addr = parse_pasv(&reply.text)?;
        if addr.ip().is_unspecified() {
            addr.set_ip(self.writer.peer_addr()?.ip());
        }
        open(addr, self.timeout)
    }
}

impl Connection for FtpConnection {
    fn change_directory(&mut self, path: &str) -> Result<(), RemoteError> {
        check(self.command(&format!("CWD {path}"))?, &[200, 250])?;
        Ok(())
    }

    fn current_path(&mut self) -> Result<String, RemoteError> {
        let reply = check(self.command("PWD")?, &[257])?;
        parse_pwd(&reply.text)
    }

    fn list_entries(&mut self) -> Result<Vec<String>, RemoteError> {
        let mut data = self.passive()?;
        let reply = self.command("NLST")?;
        match reply.code {
            125 | 150 => {}
            // Some servers refuse to list an empty directory
            450 | 550 if reply.text.to_lowercase().contains("no files found") => {
                return Ok(Vec::new());
            }
            _ => return Err(reject(reply)),
        }

        let mut buf = Vec::new();
        data.read_to_end(&mut buf)?;
        drop(data);
        check(self.read_reply()?, &[226, 250])?;

        Ok(String::from_utf8_lossy(&buf)
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    fn size_of(&mut self, name: &str) -> Result<u64, RemoteError> {
        let reply = check(self.command(&format!("SIZE {name}"))?, &[213])?;
        reply
            .text
            .trim()
            .parse()
            .map_err(|_| RemoteError::Protocol(format!("bad SIZE reply {:?}", reply.text)))
    }

    fn close(&mut self) -> Result<(), RemoteError> {
        let reply = self.command("QUIT")?;
        debug!(code = reply.code, "session closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open(addr: SocketAddr, timeout: Option<Duration>) -> Result<TcpStream, RemoteError> {
    let stream = match timeout {
        Some(t) => TcpStream::connect_timeout(&addr, t)?,
        None    => TcpStream::connect(addr)?,
    };
    stream.set_nodelay(true)?;
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;
    Ok(stream)
}

/// Pass `reply` through if its code is expected, otherwise turn it into the
/// matching error.
fn check(reply: Reply, expected: &[u16]) -> Result<Reply, RemoteError> {
    if expected.contains(&reply.code) {
        Ok(reply)
    } else {
        Err(reject(reply))
    }
}

fn reject(reply: Reply) -> RemoteError {
    match reply.code {
        400..=499 => RemoteError::Transient {
            code:    reply.code,
            message: reply.text,
        },
        500..=599 => RemoteError::Permission {
            code:    reply.code,
            message: reply.text,
        },
        code => RemoteError::Protocol(format!("{code} {}", reply.text)),
    }
}

fn parse_code(line: &str) -> Result<u16, RemoteError> {
    line.get(..3)
        .and_then(|c| c.parse::<u16>().ok())
        .filter(|c| (100..600).contains(c))
        .ok_or_else(|| RemoteError::Protocol(format!("malformed reply {line:?}")))
}

/// `Entering Passive Mode (h1,h2,h3,h4,p1,p2)`. The last six numbers in
/// the text are taken, so servers that drop the parentheses still parse.
fn parse_pasv(text: &str) -> Result<SocketAddr, RemoteError> {
    let nums: Vec<u16> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|s| s.parse().ok())
        .collect();

    let bad = || RemoteError::Protocol(format!("bad PASV reply {text:?}"));
    if nums.len() < 6 {
        return Err(bad());
    }
    let n = &nums[nums.len() - 6..];
    if n.iter().any(|&v| v > 255) {
        return Err(bad());
    }

    let ip = Ipv4Addr::new(n[0] as u8, n[1] as u8, n[2] as u8, n[3] as u8);
    Ok(SocketAddr::new(IpAddr::V4(ip), n[4] * 256 + n[5]))
}

/// `"/some/dir" is the current directory`, with `""` standing for a quote.
fn parse_pwd(text: &str) -> Result<String, RemoteError> {
    let bad = || RemoteError::Protocol(format!("bad PWD reply {text:?}"));
    let start = text.find('"').ok_or_else(bad)?;

    let mut path = String::new();
    let mut chars = text[start + 1..].chars().peekable();
    while let Some(c) = chars.next() {
        if c != '"' {
            path.push(c);
        } else if chars.peek() == Some(&'"') {
            chars.next();
            path.push('"');
        } else {
            return Ok(path);
        }
    }
    Err(bad())
}
