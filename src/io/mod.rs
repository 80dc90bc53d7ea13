//! Flat-file inputs and outputs.
//!
//! Every input line holds whitespace-, tab- or pipe-separated fields:
//!
//! - vertex files: `id latitude longitude`
//! - edge files: `id first second`, where the declared id is ignored and
//!   edges are numbered in file order
//! - path files: one edge per line, identified by its first field
//!
//! Records are written back as tab-separated lines, one per step.

use log::{debug, info};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::IoError;
use crate::graph::{Graph, VertexId};
use crate::path::RoadPath;
use crate::query::Record;


const SEPARATORS: [char; 3] = [' ', '|', '\t'];

fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(SEPARATORS).filter(|field| !field.is_empty())
}

fn field<'a, T: FromStr>(columns: &mut impl Iterator<Item = &'a str>, line: usize, name: &str) -> Result<T, IoError> {
    let value = columns.next().ok_or_else(|| IoError::Parse {
        line,
        reason: format!("missing {name}"),
    })?;

    value.trim().parse::<T>().map_err(|_| IoError::Parse {
        line,
        reason: format!("{name} is not valid: `{value}`"),
    })
}

/// Non-blank lines, numbered from one.
fn lines(reader: impl BufRead) -> impl Iterator<Item = Result<(usize, String), IoError>> {
    reader
        .lines()
        .enumerate()
        .map(|(index, line)| line.map(|line| (index + 1, line)).map_err(IoError::from))
        .filter(|line| !matches!(line, Ok((_, text)) if text.trim().is_empty()))
}

/// Builds a graph from a vertex and an edge listing.
pub fn read_graph(vertices: impl BufRead, edges: impl BufRead) -> Result<Graph, IoError> {
    let mut builder = Graph::builder();

    for line in lines(vertices) {
        let (number, text) = line?;
        let mut columns = fields(&text);

        let id = field::<VertexId>(&mut columns, number, "vertex id")?;
        let latitude = field::<f64>(&mut columns, number, "latitude")?;
        let longitude = field::<f64>(&mut columns, number, "longitude")?;

        builder.vertex(id, longitude, latitude)?;
    }

    for line in lines(edges) {
        let (number, text) = line?;
        let mut columns = fields(&text);

        let _declared = field::<usize>(&mut columns, number, "edge id")?;
        let first = field::<VertexId>(&mut columns, number, "first vertex")?;
        let second = field::<VertexId>(&mut columns, number, "second vertex")?;

        builder.edge(first, second)?;
    }

    Ok(builder.build())
}

pub fn read_graph_files(vertices: impl AsRef<Path>, edges: impl AsRef<Path>) -> Result<Graph, IoError> {
    info!(
        "Reading graph from {} and {}",
        vertices.as_ref().display(),
        edges.as_ref().display()
    );

    let vertices = BufReader::new(File::open(vertices)?);
    let edges = BufReader::new(File::open(edges)?);
    read_graph(vertices, edges)
}

/// Reads a reference or complete path as a sequence of edge ids.
pub fn read_path(graph: &Graph, reader: impl BufRead) -> Result<RoadPath, IoError> {
    let mut ids = vec![];
    for line in lines(reader) {
        let (number, text) = line?;
        ids.push(field::<usize>(&mut fields(&text), number, "edge id")?);
    }

    let path = RoadPath::from_ids(graph, &ids)?;
    debug!("Read path of {} edges ({:.1}m)", path.len(), path.length);
    Ok(path)
}

pub fn read_path_file(graph: &Graph, path: impl AsRef<Path>) -> Result<RoadPath, IoError> {
    read_path(graph, BufReader::new(File::open(path)?))
}

/// The column layout of a record listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Per-step measurements of single-point queries.
    Single,
    /// Per-step progress of continuous queries, against the round's
    /// total run time.
    Continuous { total: Duration },
}

/// Writes one tab-separated line per record.
///
/// Steps are numbered from one. A record without a matched reference
/// position reports `-1`.
pub fn write_records(mut writer: impl Write, records: &[Record], layout: RecordLayout) -> Result<(), IoError> {
    for (index, record) in records.iter().enumerate() {
        let run_time = match layout {
            RecordLayout::Single => record.run_time,
            RecordLayout::Continuous { total } => total.as_secs_f64(),
        };

        write!(
            writer,
            "{:.6}\t{:.6}\t{}\t{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
            record.ratio_num_edge,
            run_time,
            index + 1,
            record.com_path_size,
            record.num_of_out_pri_queue,
            record.refer_path_length,
            record.ratio_path_length,
            record.curr_path_length,
            record.com_path_length,
        )?;

        if layout == RecordLayout::Single {
            let location = record.location_of_refer.map_or(-1, |location| location as i64);
            write!(
                writer,
                "\t{}\t{}\t{}\t{}\t{}",
                record.num_dfd_cal,
                record.num_refer_discrete,
                record.num_tem_discrete,
                record.refer_path_size,
                location,
            )?;
        }

        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_records_file(path: impl AsRef<Path>, records: &[Record], layout: RecordLayout) -> Result<(), IoError> {
    debug!("Writing {} records to {}", records.len(), path.as_ref().display());
    write_records(BufWriter::new(File::create(path)?), records, layout)
}
