//! Line-delimited JSON adapter: one solve request per line in, one event per
//! line out.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::thread;

use crate::algorithms::Algorithm;
use crate::config::EngineConfig;
use crate::cost::Weather;
use crate::error::{ProtocolError, SolveError};
use crate::events::SearchEvent;
use crate::grid::{Cell, Grid, Position};
use crate::session::solve_with;

/// A solve request as the UI sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub grid: Vec<Vec<Cell>>,
    pub start_pos: Option<Position>,
    pub end_pos: Option<Position>,
    #[serde(default)]
    pub algorithm: String,
    #[serde(default)]
    pub weather: Weather,
}

impl SolveRequest {
    /// An empty algorithm name means BFS.
    pub fn algorithm(&self) -> Result<Algorithm, ProtocolError> {
        if self.algorithm.trim().is_empty() {
            return Ok(Algorithm::Bfs);
        }
        Ok(self.algorithm.parse()?)
    }
}

#[derive(Serialize)]
struct ErrorRecord<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    error: &'a str,
}

fn write_line<W: Write, T: Serialize>(writer: &mut W, record: &T) -> Result<(), ProtocolError> {
    serde_json::to_writer(&mut *writer, record)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn write_error<W: Write>(writer: &mut W, message: &str) -> Result<(), ProtocolError> {
    write_line(
        writer,
        &ErrorRecord {
            kind: "error",
            error: message,
        },
    )
}

fn handle_request<W: Write>(
    line: &[u8],
    writer: &mut W,
    config: &EngineConfig,
) -> Result<(), ProtocolError> {
    let request: SolveRequest = serde_json::from_slice(line)?;
    let algorithm = request.algorithm()?;
    let grid = Grid::from_cells(&request.grid).map_err(SolveError::from)?;
    tracing::info!(
        "solving {}x{} grid with {} in {} weather",
        grid.width(),
        grid.height(),
        algorithm,
        request.weather
    );

    let stream = solve_with(
        config,
        &grid,
        request.start_pos,
        request.end_pos,
        algorithm,
        request.weather,
    )?;
    for event in stream {
        write_line(writer, &event)?;
    }
    Ok(())
}

/// Serves requests from `reader` until it is exhausted.
///
/// A request that cannot be parsed or fails its preconditions is answered
/// with a single error record and the loop moves on. Only I/O failures on
/// `writer` end the loop early.
pub fn serve_lines<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    config: &EngineConfig,
) -> Result<(), ProtocolError> {
    // Raw bytes, so a line that is not UTF-8 is just another bad request.
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match handle_request(&line, &mut writer, config) {
            Ok(()) => {}
            Err(ProtocolError::Io(e)) => return Err(ProtocolError::Io(e)),
            Err(e) => {
                tracing::warn!("rejected request: {}", e);
                write_error(&mut writer, &e.to_string())?;
            }
        }
    }
}

fn serve_connection(stream: TcpStream, config: &EngineConfig) -> Result<(), ProtocolError> {
    let reader = BufReader::new(stream.try_clone()?);
    let writer = BufWriter::new(stream);
    serve_lines(reader, writer, config)
}

/// Accepts connections on `listener`, one thread per connection.
pub fn serve_listener(listener: TcpListener, config: EngineConfig) -> Result<(), ProtocolError> {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("failed to accept connection: {}", e);
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        tracing::info!("client connected: {}", peer);

        let config = config.clone();
        let name = format!("conn-{}", peer);
        thread::Builder::new().name(name).spawn(move || {
            match serve_connection(stream, &config) {
                Ok(()) => tracing::info!("client disconnected: {}", peer),
                Err(e) => tracing::warn!("connection {} closed: {}", peer, e),
            }
        })?;
    }
    Ok(())
}

pub fn serve_tcp<A: ToSocketAddrs>(addr: A, config: EngineConfig) -> Result<(), ProtocolError> {
    let listener = TcpListener::bind(addr)?;
    if let Ok(local) = listener.local_addr() {
        tracing::info!("listening on {}", local);
    }
    serve_listener(listener, config)
}

/// Parses one line of server output.
pub fn parse_event(line: &str) -> Result<SearchEvent, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(grid: &Grid, start: Option<Position>, end: Option<Position>, algorithm: &str) -> String {
        serde_json::to_string(&SolveRequest {
            grid: grid.to_cells(),
            start_pos: start,
            end_pos: end,
            algorithm: algorithm.to_string(),
            weather: Weather::Clear,
        })
        .unwrap()
    }

    fn serve(input: &str) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        serve_lines(input.as_bytes(), &mut out, &EngineConfig::default()).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn reads_camel_case_requests() {
        let request: SolveRequest = serde_json::from_str(
            r#"{"grid":[[{"x":0,"y":0,"type":"road","weight":1},{"x":1,"y":0,"type":"empty"}]],
                "startPos":{"x":0,"y":0},"endPos":null,"algorithm":"astar"}"#,
        )
        .unwrap();
        assert_eq!(request.start_pos, Some(Position::new(0, 0)));
        assert_eq!(request.end_pos, None);
        assert_eq!(request.weather, Weather::Clear);
        assert_eq!(request.algorithm().unwrap(), Algorithm::AStar);
    }

    #[test]
    fn empty_algorithm_falls_back_to_bfs() {
        let request: SolveRequest =
            serde_json::from_str(r#"{"grid":[],"startPos":null,"endPos":null,"algorithm":""}"#).unwrap();
        assert_eq!(request.algorithm().unwrap(), Algorithm::Bfs);
    }

    #[test]
    fn streams_one_event_per_line() {
        let grid = Grid::new(3);
        let input = request(&grid, Some(Position::new(0, 0)), Some(Position::new(2, 2)), "bfs");
        let records = serve(&input);

        assert_eq!(records.last().unwrap()["type"], "complete");
        let found = &records[records.len() - 2];
        assert_eq!(found["type"], "path_found");
        assert_eq!(found["cost"], 4);
        assert!(records[..records.len() - 2]
            .iter()
            .all(|r| r["type"] == "visited_batch"));
    }

    #[test]
    fn bad_requests_do_not_end_the_loop() {
        let grid = Grid::new(3);
        let missing_end = request(&grid, Some(Position::new(0, 0)), None, "dfs");
        let good = request(&grid, Some(Position::new(0, 0)), Some(Position::new(0, 2)), "ucs");
        let input = format!("not json\n{}\n\n{}\n", missing_end, good);
        let records = serve(&input);

        assert_eq!(records[0]["type"], "error");
        assert_eq!(records[1]["type"], "error");
        assert_eq!(records[1]["error"], "no end position set");
        assert_eq!(records.last().unwrap()["type"], "complete");
    }
}
