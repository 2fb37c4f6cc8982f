//! Point cloud loader
//!
//! Supports:
//! - PLY (ASCII, binary little and big endian), vertex element with optional colour
//! - XYZ / PTS text (`x y z [r g b]`, `x y z intensity [r g b]`)
//! - LAS via the `las` crate, re-centred on the first point
//!
//! The result is a single node carrying a point batch.

use std::io::Cursor;
use std::path::Path;

use glam::{DVec3, Vec3};
use lab_scene::{Component, PointBatch, SceneNode, Transform};

use crate::loader::{
    extension_key, node_name, LoadError, LoadResult, LoadedAsset, LoaderCategory, RuntimeLoader,
};

/// Loader for point cloud scans
#[derive(Debug, Default)]
pub struct PointCloudLoader;

impl RuntimeLoader for PointCloudLoader {
    fn name(&self) -> &'static str {
        "point-cloud"
    }

    fn category(&self) -> LoaderCategory {
        LoaderCategory::Cad
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".ply", ".xyz", ".pts", ".las"]
    }

    fn decode(&self, data: &[u8], path: &Path) -> LoadResult {
        let (batch, origin) = match extension_key(path).as_deref() {
            Some(".ply") => (parse_ply(data).map_err(|m| LoadError::decode(path, m))?, Vec3::ZERO),
            Some(".las") => read_las(data).map_err(|e| LoadError::decode(path, e))?,
            Some(ext) => {
                let text = std::str::from_utf8(data).map_err(|e| LoadError::decode(path, e))?;
                let batch =
                    parse_text(text, ext == ".pts").map_err(|m| LoadError::decode(path, m))?;
                (batch, Vec3::ZERO)
            }
            None => return Err(LoadError::UnsupportedFormat(path.display().to_string())),
        };

        let bounds = batch.bounding_box().ok_or_else(|| LoadError::empty(path))?;
        log::debug!("PointCloudLoader: {} points from {}", batch.len(), path.display());

        let node = SceneNode::new(node_name(path))
            .with_transform(Transform {
                translation: origin,
                ..Transform::IDENTITY
            })
            .with_component(Component::Points(batch));

        Ok(LoadedAsset::new(node, Some(bounds)))
    }
}

fn parse_text(text: &str, pts: bool) -> Result<PointBatch, String> {
    let mut batch = PointBatch::default();
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#') && !l.starts_with("//"))
        .peekable();

    // PTS files open with the point count
    if pts {
        if let Some((_, first)) = lines.peek() {
            if first.split_whitespace().count() == 1 && first.parse::<u64>().is_ok() {
                lines.next();
            }
        }
    }

    for (line_no, line) in lines {
        let fields: Vec<f32> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|e| format!("line {}: {}", line_no, e))?;

        if fields.len() < 3 {
            return Err(format!("line {}: expected at least three coordinates", line_no));
        }
        batch.positions.push(Vec3::new(fields[0], fields[1], fields[2]));

        let color_at = if pts && fields.len() >= 7 {
            Some(4)
        } else if fields.len() >= 6 {
            Some(3)
        } else {
            None
        };
        if let Some(at) = color_at {
            let c = |v: f32| v.clamp(0.0, 255.0) as u8;
            batch.colors.push([c(fields[at]), c(fields[at + 1]), c(fields[at + 2]), 255]);
        }
    }

    // Partial colour is treated as none
    if batch.colors.len() != batch.positions.len() {
        batch.colors.clear();
    }

    Ok(batch)
}

fn read_las(data: &[u8]) -> Result<(PointBatch, Vec3), las::Error> {
    let mut reader = las::Reader::new(Cursor::new(data.to_vec()))?;
    let mut batch = PointBatch::default();
    let mut origin: Option<DVec3> = None;

    for point in reader.points() {
        let point = point?;
        let p = DVec3::new(point.x, point.y, point.z);
        let origin = *origin.get_or_insert(p);
        batch.positions.push((p - origin).as_vec3());

        if let Some(color) = point.color {
            batch.colors.push([
                (color.red >> 8) as u8,
                (color.green >> 8) as u8,
                (color.blue >> 8) as u8,
                255,
            ]);
        }
    }

    if batch.colors.len() != batch.positions.len() {
        batch.colors.clear();
    }

    Ok((batch, origin.unwrap_or(DVec3::ZERO).as_vec3()))
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PlyFormat {
    Ascii,
    LittleEndian,
    BigEndian,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

#[derive(Debug)]
enum PropertyKind {
    Scalar(ScalarType),
    List { count: ScalarType, item: ScalarType },
}

#[derive(Debug)]
struct PlyProperty {
    name: String,
    kind: PropertyKind,
}

#[derive(Debug)]
struct PlyElement {
    name: String,
    count: usize,
    properties: Vec<PlyProperty>,
}

struct PlyHeader {
    format: PlyFormat,
    elements: Vec<PlyElement>,
    body_offset: usize,
}

fn parse_ply_header(data: &[u8]) -> Result<PlyHeader, String> {
    const END: &[u8] = b"end_header";
    let end = data
        .windows(END.len())
        .position(|w| w == END)
        .ok_or("missing end_header")?;
    let body_offset = data[end..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|p| end + p + 1)
        .unwrap_or(data.len());

    let header = std::str::from_utf8(&data[..end]).map_err(|e| e.to_string())?;
    let mut lines = header.lines().map(str::trim);
    if lines.next() != Some("ply") {
        return Err("missing ply magic".into());
    }

    let mut format = None;
    let mut elements: Vec<PlyElement> = Vec::new();

    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["format", f, _version] => {
                format = Some(match *f {
                    "ascii" => PlyFormat::Ascii,
                    "binary_little_endian" => PlyFormat::LittleEndian,
                    "binary_big_endian" => PlyFormat::BigEndian,
                    other => return Err(format!("unknown PLY format {}", other)),
                });
            }
            ["element", name, count] => elements.push(PlyElement {
                name: name.to_string(),
                count: count.parse().map_err(|_| format!("bad element count {}", count))?,
                properties: Vec::new(),
            }),
            ["property", "list", count, item, name] => {
                let element = elements.last_mut().ok_or("property before element")?;
                element.properties.push(PlyProperty {
                    name: name.to_string(),
                    kind: PropertyKind::List {
                        count: ScalarType::parse(count)
                            .ok_or_else(|| format!("bad type {}", count))?,
                        item: ScalarType::parse(item).ok_or_else(|| format!("bad type {}", item))?,
                    },
                });
            }
            ["property", ty, name] => {
                let element = elements.last_mut().ok_or("property before element")?;
                element.properties.push(PlyProperty {
                    name: name.to_string(),
                    kind: PropertyKind::Scalar(
                        ScalarType::parse(ty).ok_or_else(|| format!("bad type {}", ty))?,
                    ),
                });
            }
            _ => {}
        }
    }

    Ok(PlyHeader {
        format: format.ok_or("missing format line")?,
        elements,
        body_offset,
    })
}

/// Sequential reader over a PLY body
enum PlyBody<'a> {
    Ascii(std::str::SplitWhitespace<'a>),
    Binary {
        data: &'a [u8],
        pos: usize,
        big_endian: bool,
    },
}

impl PlyBody<'_> {
    fn read(&mut self, ty: ScalarType) -> Result<f64, String> {
        match self {
            Self::Ascii(tokens) => tokens
                .next()
                .ok_or_else(|| "unexpected end of data".to_string())?
                .parse::<f64>()
                .map_err(|e| e.to_string()),
            Self::Binary { data, pos, big_endian } => {
                let size = ty.size();
                let bytes = data.get(*pos..*pos + size).ok_or("unexpected end of data")?;
                *pos += size;

                let mut buf = [0u8; 8];
                buf[..size].copy_from_slice(bytes);
                if *big_endian {
                    buf[..size].reverse();
                }

                Ok(match ty {
                    ScalarType::I8 => buf[0] as i8 as f64,
                    ScalarType::U8 => buf[0] as f64,
                    ScalarType::I16 => i16::from_le_bytes([buf[0], buf[1]]) as f64,
                    ScalarType::U16 => u16::from_le_bytes([buf[0], buf[1]]) as f64,
                    ScalarType::I32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
                    ScalarType::U32 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
                    ScalarType::F32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
                    ScalarType::F64 => f64::from_le_bytes(buf),
                })
            }
        }
    }
}

fn parse_ply(data: &[u8]) -> Result<PointBatch, String> {
    let header = parse_ply_header(data)?;
    let body = &data[header.body_offset..];

    let mut reader = match header.format {
        PlyFormat::Ascii => PlyBody::Ascii(
            std::str::from_utf8(body)
                .map_err(|e| e.to_string())?
                .split_whitespace(),
        ),
        PlyFormat::LittleEndian => PlyBody::Binary {
            data: body,
            pos: 0,
            big_endian: false,
        },
        PlyFormat::BigEndian => PlyBody::Binary {
            data: body,
            pos: 0,
            big_endian: true,
        },
    };

    let mut batch = PointBatch::default();

    for element in &header.elements {
        let is_vertex = element.name == "vertex";
        let slot = |name: &str| element.properties.iter().position(|p| p.name == name);
        let xyz = [slot("x"), slot("y"), slot("z")];
        let rgb = [
            slot("red").or_else(|| slot("diffuse_red")),
            slot("green").or_else(|| slot("diffuse_green")),
            slot("blue").or_else(|| slot("diffuse_blue")),
        ];
        if is_vertex && xyz.iter().any(Option::is_none) {
            return Err("vertex element without x, y, z".into());
        }
        let has_color = rgb.iter().all(Option::is_some);

        let mut values = vec![0.0f64; element.properties.len()];
        for _ in 0..element.count {
            for (i, property) in element.properties.iter().enumerate() {
                match property.kind {
                    PropertyKind::Scalar(ty) => {
                        let v = reader.read(ty)?;
                        values[i] = if ty.is_float() || !rgb.contains(&Some(i)) {
                            v
                        } else {
                            v / 255.0
                        };
                    }
                    PropertyKind::List { count, item } => {
                        let n = reader.read(count)? as usize;
                        for _ in 0..n {
                            reader.read(item)?;
                        }
                    }
                }
            }

            if is_vertex {
                let at = |slot: Option<usize>| slot.map_or(0.0, |i| values[i]);
                batch.positions.push(DVec3::new(at(xyz[0]), at(xyz[1]), at(xyz[2])).as_vec3());
                if has_color {
                    let c = |slot: Option<usize>| (at(slot).clamp(0.0, 1.0) * 255.0).round() as u8;
                    batch.colors.push([c(rgb[0]), c(rgb[1]), c(rgb[2]), 255]);
                }
            }
        }

        // Elements after the vertices are not needed
        if is_vertex {
            break;
        }
    }

    Ok(batch)
}
