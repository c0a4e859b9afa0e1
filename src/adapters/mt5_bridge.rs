//! MT5 bridge: line-oriented TCP session with the terminal-side bridge EA.
//!
//! Every command is one `\n`-terminated line and gets one reply line, except
//! `HISTORY` which streams `BAR:` lines closed by `END`. Failures come back as
//! `ERR:<code>,<message>`.
//!
//! ```text
//! HELLO:<symbol>,<timeframe>            -> OK
//! LOGIN:<login>,<password>,<server>     -> OK
//! HISTORY:<symbol>,<timeframe>,<count>  -> BAR:<epoch>,<o>,<h>,<l>,<c>,<vol> ... END
//! ACCOUNT:<symbol>                      -> ACCOUNT:<balance>,<equity>,<open_positions>
//! SYMBOL:<symbol>                       -> SYMBOL:<contract_size>,<point>,<vol_min>,<vol_max>
//! ORDER:<symbol>,<side>,<lot>,<sl>,<tp>,<deviation>,<magic>,<comment> -> ORDER_OK:<ticket>,<price>
//! BYE
//! ```
//!
//! SL/TP travel as distances in points; the EA converts them to prices
//! against the fill.

use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::domain::{AccountState, Bar, InstrumentSpec, OrderReceipt, OrderTicket};
use crate::error::{BridgeError, ConfluenceError, Result};
use crate::exchange::BrokerGateway;

/// Max slippage in points accepted by the EA
pub const ORDER_DEVIATION: u32 = 50;
/// Magic number tagging this bot's positions in the terminal
pub const ORDER_MAGIC: u64 = 123456;
/// Terminal limit on order comment length
const MAX_COMMENT_LEN: usize = 31;

struct Session {
    lines: Lines<BufReader<ReadHalf<TcpStream>>>,
    writer: WriteHalf<TcpStream>,
    /// Set while a command waits for its reply. A caller dropped mid-exchange
    /// leaves it set and the stream may still hold that reply.
    in_flight: bool,
}

impl Session {
    async fn send(&mut self, command: &str) -> Result<()> {
        self.writer.write_all(command.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn next_line(&mut self) -> Result<String> {
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(BridgeError::ConnectionClosed.into()),
        }
    }
}

/// Broker gateway backed by the MT5 bridge EA
pub struct Mt5Bridge {
    config: BridgeConfig,
    symbol: String,
    timeframe: &'static str,
    session: Mutex<Option<Session>>,
}

impl Mt5Bridge {
    pub fn new(config: BridgeConfig, symbol: impl Into<String>, timeframe_minutes: u32) -> Self {
        Self {
            config,
            symbol: symbol.into(),
            timeframe: timeframe_code(timeframe_minutes),
            session: Mutex::new(None),
        }
    }

    async fn open_session(&self) -> Result<Session> {
        let addr = self.config.addr();
        info!("Connecting to MT5 bridge at {}...", addr);

        let stream = TcpStream::connect(&addr).await?;
        let (read_half, write_half) = tokio::io::split(stream);
        let mut session = Session {
            lines: BufReader::new(read_half).lines(),
            writer: write_half,
            in_flight: false,
        };

        let hello = format!("HELLO:{},{}", self.symbol, self.timeframe);
        session.send(&hello).await?;
        expect_ok("HELLO", &session.next_line().await?)?;

        match (&self.config.login, &self.config.password, &self.config.server) {
            (Some(login), Some(password), Some(server)) => {
                info!("Logging in to MT5: login={}, server={}", login, server);
                session.send(&format!("LOGIN:{},{},{}", login, password, server)).await?;
                let reply = session.next_line().await?;
                if let Some(err) = parse_error(&reply) {
                    return Err(BridgeError::LoginRejected(err.to_string()).into());
                }
                expect_ok("LOGIN", &reply)?;
            }
            _ => warn!(
                "MT5 login/password/server incomplete; assuming the terminal is already logged in"
            ),
        }

        info!("MT5 bridge ready. Symbol: {}, TF: {}", self.symbol, self.timeframe);
        Ok(session)
    }

    /// Send one command and collect reply lines until `done` says stop.
    ///
    /// A dropped connection clears the session; the next request reconnects.
    /// So does a session left mid-exchange by a cancelled caller, since its
    /// late reply would otherwise answer the next command.
    async fn exchange<F>(&self, command: &str, mut done: F) -> Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut guard = self.session.lock().await;
        if guard.as_ref().is_some_and(|s| s.in_flight) {
            warn!("MT5 bridge session has an unanswered request, reconnecting");
            *guard = None;
        }
        if guard.is_none() {
            warn!("MT5 bridge session missing, reconnecting");
            *guard = Some(self.open_session().await?);
        }
        let Some(session) = guard.as_mut() else {
            return Err(BridgeError::NotConnected {
                addr: self.config.addr(),
            }
            .into());
        };

        session.in_flight = true;
        let result = round_trip(session, command, &mut done).await;
        session.in_flight = false;

        if matches!(
            result,
            Err(ConfluenceError::Io(_))
                | Err(ConfluenceError::Bridge(BridgeError::ConnectionClosed))
        ) {
            *guard = None;
        }
        result
    }

    async fn request(&self, command: &str) -> Result<String> {
        let mut replies = self.exchange(command, |_| true).await?;
        replies.pop().ok_or_else(|| BridgeError::ConnectionClosed.into())
    }
}

#[async_trait]
impl BrokerGateway for Mt5Bridge {
    async fn connect(&self) -> Result<()> {
        let session = self.open_session().await?;
        *self.session.lock().await = Some(session);
        Ok(())
    }

    async fn get_history(&self, bars: usize) -> Result<Vec<Bar>> {
        let command = format!("HISTORY:{},{},{}", self.symbol, self.timeframe, bars);
        let lines = self.exchange(&command, |line| line == "END").await?;

        let mut out = Vec::with_capacity(lines.len().saturating_sub(1));
        for line in lines.iter().filter(|l| l.as_str() != "END") {
            let Some(payload) = line.strip_prefix("BAR:") else {
                return Err(unexpected("HISTORY", line));
            };
            out.push(parse_bar(payload)?);
        }
        debug!("MT5 bridge: {} bars for {}", out.len(), self.symbol);
        Ok(out)
    }

    async fn account_state(&self, symbol: &str) -> Result<AccountState> {
        let reply = self.request(&format!("ACCOUNT:{}", symbol)).await?;
        let payload = reply
            .strip_prefix("ACCOUNT:")
            .ok_or_else(|| unexpected("ACCOUNT", &reply))?;
        Ok(parse_account(payload)?)
    }

    async fn instrument(&self, symbol: &str) -> Result<InstrumentSpec> {
        let reply = self.request(&format!("SYMBOL:{}", symbol)).await?;
        let payload = reply
            .strip_prefix("SYMBOL:")
            .ok_or_else(|| unexpected("SYMBOL", &reply))?;
        Ok(parse_symbol(symbol, payload)?)
    }

    async fn submit_order(&self, ticket: &OrderTicket) -> Result<OrderReceipt> {
        let command = format_order(ticket);
        info!("MT5 bridge request: {}", command);
        let reply = self.request(&command).await?;
        let payload = reply
            .strip_prefix("ORDER_OK:")
            .ok_or_else(|| unexpected("ORDER", &reply))?;
        let receipt = parse_order_ok(payload)?;
        info!(
            "Order filled: ticket={} price={}",
            receipt.ticket,
            receipt.price.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
        );
        Ok(receipt)
    }

    async fn shutdown(&self) -> Result<()> {
        let mut guard = self.session.lock().await;
        if let Some(mut session) = guard.take() {
            if let Err(e) = session.send("BYE").await {
                warn!("MT5 bridge: BYE failed: {}", e);
            }
            let _ = session.writer.shutdown().await;
            info!("Disconnected from MT5 bridge");
        }
        Ok(())
    }
}

async fn round_trip<F>(session: &mut Session, command: &str, done: &mut F) -> Result<Vec<String>>
where
    F: FnMut(&str) -> bool,
{
    session.send(command).await?;
    debug!("Sent: {}", redact(command));
    let mut replies = Vec::new();
    loop {
        let line = session.next_line().await?;
        if let Some(err) = parse_error(&line) {
            return Err(err.into());
        }
        let finished = done(&line);
        replies.push(line);
        if finished {
            return Ok(replies);
        }
    }
}

/// Terminal timeframe code for a bar interval; unknown intervals fall back to M15
pub fn timeframe_code(minutes: u32) -> &'static str {
    match minutes {
        1 => "M1",
        5 => "M5",
        15 => "M15",
        30 => "M30",
        60 => "H1",
        other => {
            warn!("Unsupported timeframe {}m, using M15", other);
            "M15"
        }
    }
}

fn format_order(ticket: &OrderTicket) -> String {
    format!(
        "ORDER:{},{},{},{},{},{},{},{}",
        ticket.symbol,
        ticket.side,
        ticket.lot.normalize(),
        ticket.sl_distance.normalize(),
        ticket.tp_distance.normalize(),
        ORDER_DEVIATION,
        ORDER_MAGIC,
        sanitize_comment(&ticket.comment)
    )
}

/// Commas and line breaks would split the command; the terminal truncates anyway
fn sanitize_comment(comment: &str) -> String {
    comment
        .chars()
        .map(|c| if c == ',' || c.is_control() { ' ' } else { c })
        .take(MAX_COMMENT_LEN)
        .collect()
}

fn redact(command: &str) -> String {
    if command.starts_with("LOGIN:") {
        "LOGIN:***".to_string()
    } else {
        command.to_string()
    }
}

fn expect_ok(command: &str, line: &str) -> Result<()> {
    if line == "OK" {
        Ok(())
    } else {
        Err(unexpected(command, line))
    }
}

fn unexpected(command: &str, line: &str) -> ConfluenceError {
    BridgeError::UnexpectedReply {
        command: command.to_string(),
        line: line.to_string(),
    }
    .into()
}

fn parse_error(line: &str) -> Option<BridgeError> {
    let payload = line.strip_prefix("ERR:")?;
    let (code, message) = payload.split_once(',').unwrap_or((payload, ""));
    Some(BridgeError::Terminal {
        code: code.trim().parse().unwrap_or(-1),
        message: message.trim().to_string(),
    })
}

fn fields<'a>(
    payload: &'a str,
    expected: usize,
    what: &'static str,
) -> std::result::Result<Vec<&'a str>, BridgeError> {
    let parts: Vec<&str> = payload.split(',').map(str::trim).collect();
    if parts.len() < expected {
        return Err(BridgeError::MalformedField {
            field: what,
            value: payload.to_string(),
        });
    }
    Ok(parts)
}

fn float(field: &'static str, raw: &str) -> std::result::Result<f64, BridgeError> {
    raw.parse().map_err(|_| BridgeError::MalformedField {
        field,
        value: raw.to_string(),
    })
}

fn decimal(field: &'static str, raw: &str) -> std::result::Result<Decimal, BridgeError> {
    Decimal::from_str(raw).map_err(|_| BridgeError::MalformedField {
        field,
        value: raw.to_string(),
    })
}

fn parse_bar(payload: &str) -> std::result::Result<Bar, BridgeError> {
    let parts = fields(payload, 6, "bar")?;
    let secs: i64 = parts[0].parse().map_err(|_| BridgeError::MalformedField {
        field: "time",
        value: parts[0].to_string(),
    })?;
    let time = DateTime::from_timestamp(secs, 0).ok_or_else(|| BridgeError::MalformedField {
        field: "time",
        value: parts[0].to_string(),
    })?;

    Ok(Bar {
        time,
        open: float("open", parts[1])?,
        high: float("high", parts[2])?,
        low: float("low", parts[3])?,
        close: float("close", parts[4])?,
        volume: float("volume", parts[5])?,
    })
}

fn parse_account(payload: &str) -> std::result::Result<AccountState, BridgeError> {
    let parts = fields(payload, 3, "account")?;
    Ok(AccountState {
        equity: decimal("equity", parts[1])?,
        open_positions: parts[2].parse().map_err(|_| BridgeError::MalformedField {
            field: "open_positions",
            value: parts[2].to_string(),
        })?,
    })
}

fn parse_symbol(symbol: &str, payload: &str) -> std::result::Result<InstrumentSpec, BridgeError> {
    let parts = fields(payload, 4, "symbol")?;
    Ok(InstrumentSpec {
        symbol: symbol.to_string(),
        contract_size: decimal("contract_size", parts[0])?,
        point: decimal("point", parts[1])?,
        volume_min: decimal("volume_min", parts[2])?,
        volume_max: decimal("volume_max", parts[3])?,
    })
}

fn parse_order_ok(payload: &str) -> std::result::Result<OrderReceipt, BridgeError> {
    let parts = fields(payload, 1, "order")?;
    let ticket = parts[0].parse().map_err(|_| BridgeError::MalformedField {
        field: "ticket",
        value: parts[0].to_string(),
    })?;
    let price = parts.get(1).and_then(|p| Decimal::from_str(p).ok());
    Ok(OrderReceipt {
        ticket,
        price,
        dry_run: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Action;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[test]
    fn parses_bar_line() {
        let bar = parse_bar("1704153600,2060.5,2062.0,2059.1,2061.7,1532").unwrap();
        assert_eq!(bar.time.timestamp(), 1704153600);
        assert_eq!(bar.high, 2062.0);
        assert_eq!(bar.close, 2061.7);
        assert_eq!(bar.volume, 1532.0);
    }

    #[test]
    fn rejects_short_or_garbled_bar() {
        assert!(matches!(
            parse_bar("1704153600,1,2"),
            Err(BridgeError::MalformedField { field: "bar", .. })
        ));
        assert!(matches!(
            parse_bar("1704153600,x,2,0,1,1"),
            Err(BridgeError::MalformedField { field: "open", .. })
        ));
    }

    #[test]
    fn parses_account_and_symbol() {
        let acct = parse_account("10000.00,10250.50,2").unwrap();
        assert_eq!(acct.equity, dec!(10250.50));
        assert_eq!(acct.open_positions, 2);

        let spec = parse_symbol("XAUUSD", "100,0.01,0.01,50").unwrap();
        assert_eq!(spec.tick_value(), dec!(1));
        assert_eq!(spec.volume_max, dec!(50));
    }

    #[test]
    fn parses_terminal_error() {
        match parse_error("ERR:10019,No money") {
            Some(BridgeError::Terminal { code, message }) => {
                assert_eq!(code, 10019);
                assert_eq!(message, "No money");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_error("OK").is_none());
    }

    #[test]
    fn order_line_carries_points_and_clean_comment() {
        let ticket = OrderTicket {
            symbol: "XAUUSD".to_string(),
            side: Action::Buy,
            lot: dec!(0.010),
            sl_distance: dec!(300),
            tp_distance: dec!(600),
            comment: "tech_buy,sent_neutral\nextra text that is far too long".to_string(),
        };
        let line = format_order(&ticket);
        assert!(line.starts_with("ORDER:XAUUSD,BUY,0.01,300,600,50,123456,"));
        let comment = line.rsplit(',').next().unwrap();
        assert_eq!(comment.len(), MAX_COMMENT_LEN);
        assert!(!comment.contains('\n'));
    }

    #[test]
    fn unknown_timeframe_falls_back_to_m15() {
        assert_eq!(timeframe_code(5), "M5");
        assert_eq!(timeframe_code(60), "H1");
        assert_eq!(timeframe_code(240), "M15");
    }

    fn test_config(port: u16) -> BridgeConfig {
        BridgeConfig {
            host: "127.0.0.1".to_string(),
            port,
            login: None,
            password: None,
            server: None,
        }
    }

    #[tokio::test]
    async fn history_round_trip_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = tokio::io::split(stream);
            let mut lines = BufReader::new(read_half).lines();

            assert_eq!(lines.next_line().await.unwrap().unwrap(), "HELLO:XAUUSD,M15");
            write_half.write_all(b"OK\n").await.unwrap();

            assert_eq!(lines.next_line().await.unwrap().unwrap(), "HISTORY:XAUUSD,M15,2");
            write_half
                .write_all(b"BAR:1704153600,1,2,0.5,1.5,10\nBAR:1704154500,1.5,2.5,1,2,12\nEND\n")
                .await
                .unwrap();

            assert_eq!(lines.next_line().await.unwrap().unwrap(), "ACCOUNT:XAUUSD");
            write_half.write_all(b"ERR:4,terminal busy\n").await.unwrap();
        });

        let bridge = Mt5Bridge::new(test_config(port), "XAUUSD", 15);
        bridge.connect().await.unwrap();

        let bars = bridge.get_history(2).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 2.0);

        let err = bridge.account_state("XAUUSD").await.unwrap_err();
        assert!(matches!(
            err,
            ConfluenceError::Bridge(BridgeError::Terminal { code: 4, .. })
        ));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_login_fails_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = tokio::io::split(stream);
            let mut lines = BufReader::new(read_half).lines();
            let _ = lines.next_line().await;
            write_half.write_all(b"OK\n").await.unwrap();
            let _ = lines.next_line().await;
            write_half.write_all(b"ERR:1,invalid account\n").await.unwrap();
        });

        let mut config = test_config(port);
        config.login = Some(5551234);
        config.password = Some("secret".to_string());
        config.server = Some("Demo-Server".to_string());

        let err = Mt5Bridge::new(config, "XAUUSD", 15).connect().await.unwrap_err();
        assert!(matches!(
            err,
            ConfluenceError::Bridge(BridgeError::LoginRejected(_))
        ));
    }
    #[tokio::test]
    async fn cancelled_request_does_not_leak_its_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let connections = Arc::new(AtomicUsize::new(0));
        let accepted = connections.clone();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let nth = accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let (read_half, mut write_half) = tokio::io::split(stream);
                    let mut lines = BufReader::new(read_half).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        let reply: &[u8] = if line.starts_with("HELLO") {
                            b"OK\n"
                        } else if nth == 0 {
                            // first terminal answers ACCOUNT too late
                            tokio::time::sleep(Duration::from_millis(300)).await;
                            b"ACCOUNT:1,1111,0\n"
                        } else {
                            b"ACCOUNT:2,2222,5\n"
                        };
                        if write_half.write_all(reply).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        let bridge = Mt5Bridge::new(test_config(port), "XAUUSD", 15);
        bridge.connect().await.unwrap();

        let first =
            tokio::time::timeout(Duration::from_millis(100), bridge.account_state("XAUUSD")).await;
        assert!(first.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;

        let account = bridge.account_state("XAUUSD").await.unwrap();
        assert_eq!(account.equity, dec!(2222));
        assert_eq!(account.open_positions, 5);
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }
}
