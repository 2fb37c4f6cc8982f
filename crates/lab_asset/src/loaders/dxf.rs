//! DXF loader (ASCII)
//!
//! Reads the ENTITIES section of an ASCII DXF drawing and turns the linear
//! geometry into a line batch: LINE, LWPOLYLINE, POLYLINE/VERTEX, CIRCLE and
//! ARC. Other entities are skipped. Binary DXF is rejected.

use std::path::Path;

use glam::Vec3;
use lab_scene::{Component, LineBatch, SceneNode};

use crate::loader::{node_name, LoadError, LoadResult, LoadedAsset, LoaderCategory, RuntimeLoader};

const BINARY_SENTINEL: &[u8] = b"AutoCAD Binary DXF";
const ARC_SEGMENTS: usize = 64;

/// Loader for DXF drawings
#[derive(Debug, Default)]
pub struct DxfLoader;

impl RuntimeLoader for DxfLoader {
    fn name(&self) -> &'static str {
        "dxf"
    }

    fn category(&self) -> LoaderCategory {
        LoaderCategory::Cad
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &[".dxf"]
    }

    fn decode(&self, data: &[u8], path: &Path) -> LoadResult {
        if data.starts_with(BINARY_SENTINEL) {
            return Err(LoadError::decode(path, "binary DXF is not supported"));
        }

        let text = String::from_utf8_lossy(data);
        let pairs = group_pairs(&text).map_err(|m| LoadError::decode(path, m))?;
        let entities = read_entities(&pairs).map_err(|m| LoadError::decode(path, m))?;

        let mut lines = LineBatch::default();
        for entity in &entities {
            entity.tessellate(&mut lines);
        }

        let bounds = lines.bounding_box().ok_or_else(|| LoadError::empty(path))?;
        log::debug!(
            "DxfLoader: {} entities, {} segments from {}",
            entities.len(),
            lines.len(),
            path.display()
        );

        let node = SceneNode::new(node_name(path)).with_component(Component::Lines(lines));
        Ok(LoadedAsset::new(node, Some(bounds)))
    }
}

/// One `(group code, value)` record
#[derive(Debug, Clone, PartialEq)]
struct Pair<'a> {
    code: i32,
    value: &'a str,
}

fn group_pairs(text: &str) -> Result<Vec<Pair<'_>>, String> {
    let mut lines = text.lines();
    let mut pairs = Vec::new();
    let mut line_no = 0;

    while let Some(code) = lines.next() {
        line_no += 1;
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        let code: i32 = code
            .parse()
            .map_err(|_| format!("line {}: expected group code, got {:?}", line_no, code))?;
        let value = lines
            .next()
            .ok_or_else(|| format!("line {}: group code without value", line_no))?;
        line_no += 1;
        pairs.push(Pair {
            code,
            value: value.trim(),
        });
    }

    Ok(pairs)
}

#[derive(Debug, PartialEq)]
enum Entity {
    Line { start: Vec3, end: Vec3 },
    Polyline { points: Vec<Vec3>, closed: bool },
    Arc {
        center: Vec3,
        radius: f32,
        start_deg: f32,
        end_deg: f32,
    },
}

impl Entity {
    fn tessellate(&self, out: &mut LineBatch) {
        match self {
            Self::Line { start, end } => out.push(*start, *end),
            Self::Polyline { points, closed } => {
                for w in points.windows(2) {
                    out.push(w[0], w[1]);
                }
                if *closed && points.len() > 2 {
                    out.push(points[points.len() - 1], points[0]);
                }
            }
            Self::Arc { center, radius, start_deg, end_deg } => {
                let (start, sweep) = arc_sweep(*start_deg, *end_deg);
                let steps =
                    ((ARC_SEGMENTS as f32 * sweep / 360.0).ceil() as usize).clamp(1, ARC_SEGMENTS);
                let point = |deg: f32| {
                    let rad = deg.to_radians();
                    *center + Vec3::new(rad.cos(), rad.sin(), 0.0) * *radius
                };
                for i in 0..steps {
                    let a = start + sweep * i as f32 / steps as f32;
                    let b = start + sweep * (i + 1) as f32 / steps as f32;
                    out.push(point(a), point(b));
                }
            }
        }
    }
}

/// Start angle in [0, 360) and counter-clockwise sweep in (0, 360]
fn arc_sweep(start_deg: f32, end_deg: f32) -> (f32, f32) {
    let start = start_deg.rem_euclid(360.0);
    let mut sweep = end_deg.rem_euclid(360.0) - start;
    if sweep <= 0.0 {
        sweep += 360.0;
    }
    (start, sweep.min(360.0))
}

fn parse_f32(pair: &Pair<'_>) -> Result<f32, String> {
    pair.value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("group {}: bad number {:?}", pair.code, pair.value))
}

/// Pairs belonging to the entity starting at `pairs[0]`, up to the next code 0
fn entity_body<'p, 'a>(pairs: &'p [Pair<'a>]) -> &'p [Pair<'a>] {
    let len = pairs[1..].iter().position(|p| p.code == 0).map_or(pairs.len(), |i| i + 1);
    &pairs[1..len]
}

fn read_entities(pairs: &[Pair<'_>]) -> Result<Vec<Entity>, String> {
    let start = pairs
        .windows(2)
        .position(|w| {
            w[0].code == 0 && w[0].value == "SECTION" && w[1].code == 2 && w[1].value == "ENTITIES"
        })
        .ok_or("no ENTITIES section")?;

    let mut entities = Vec::new();
    let mut i = start + 2;

    while i < pairs.len() {
        let pair = &pairs[i];
        if pair.code != 0 {
            i += 1;
            continue;
        }

        let body = entity_body(&pairs[i..]);
        match pair.value {
            "ENDSEC" | "EOF" => break,
            "LINE" => entities.push(read_line(body)?),
            "LWPOLYLINE" => entities.push(read_lwpolyline(body)?),
            "CIRCLE" | "ARC" => entities.push(read_arc(body, pair.value == "CIRCLE")?),
            "POLYLINE" => {
                let closed = flags(body)? & 1 != 0;
                let mut points = Vec::new();
                i += body.len() + 1;
                while i < pairs.len() && pairs[i].code == 0 && pairs[i].value == "VERTEX" {
                    let vertex = entity_body(&pairs[i..]);
                    points.push(read_point(vertex, 10)?);
                    i += vertex.len() + 1;
                }
                // SEQEND is skipped by the generic advance below
                entities.push(Entity::Polyline { points, closed });
                continue;
            }
            _ => {}
        }
        i += body.len() + 1;
    }

    Ok(entities)
}

fn flags(body: &[Pair<'_>]) -> Result<i32, String> {
    body.iter()
        .find(|p| p.code == 70)
        .map(|p| p.value.parse().map_err(|_| format!("bad flags {:?}", p.value)))
        .unwrap_or(Ok(0))
}

/// Point from codes `base`, `base + 10`, `base + 20`; missing coordinates are zero
fn read_point(body: &[Pair<'_>], base: i32) -> Result<Vec3, String> {
    let mut p = Vec3::ZERO;
    for pair in body {
        match pair.code {
            c if c == base => p.x = parse_f32(pair)?,
            c if c == base + 10 => p.y = parse_f32(pair)?,
            c if c == base + 20 => p.z = parse_f32(pair)?,
            _ => {}
        }
    }
    Ok(p)
}

fn read_line(body: &[Pair<'_>]) -> Result<Entity, String> {
    Ok(Entity::Line {
        start: read_point(body, 10)?,
        end: read_point(body, 11)?,
    })
}

fn read_lwpolyline(body: &[Pair<'_>]) -> Result<Entity, String> {
    let mut points: Vec<Vec3> = Vec::new();
    let mut elevation = 0.0;

    for pair in body {
        match pair.code {
            38 => elevation = parse_f32(pair)?,
            10 => points.push(Vec3::new(parse_f32(pair)?, 0.0, 0.0)),
            20 => {
                let last = points.last_mut().ok_or("LWPOLYLINE y before x")?;
                last.y = parse_f32(pair)?;
            }
            _ => {}
        }
    }

    for p in &mut points {
        p.z = elevation;
    }

    Ok(Entity::Polyline {
        points,
        closed: flags(body)? & 1 != 0,
    })
}

fn read_arc(body: &[Pair<'_>], full_circle: bool) -> Result<Entity, String> {
    let center = read_point(body, 10)?;
    let mut radius = 0.0;
    let mut start_deg = 0.0;
    let mut end_deg = 360.0;

    for pair in body {
        match pair.code {
            40 => radius = parse_f32(pair)?,
            50 if !full_circle => start_deg = parse_f32(pair)?,
            51 if !full_circle => end_deg = parse_f32(pair)?,
            _ => {}
        }
    }

    Ok(Entity::Arc {
        center,
        radius,
        start_deg,
        end_deg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawing(entities: &str) -> String {
        format!(
            "0\nSECTION\n2\nHEADER\n0\nENDSEC\n0\nSECTION\n2\nENTITIES\n{}0\nENDSEC\n0\nEOF\n",
            entities
        )
    }

    #[test]
    fn test_line_entity() {
        let dxf = drawing("0\nLINE\n8\n0\n10\n1.0\n20\n2.0\n30\n0.0\n11\n4.0\n21\n6.0\n31\n0.0\n");
        let asset = DxfLoader.decode(dxf.as_bytes(), Path::new("line.dxf")).unwrap();

        let lines = asset.node.find_component::<LineBatch>().unwrap();
        assert_eq!(lines.segments, vec![(Vec3::new(1.0, 2.0, 0.0), Vec3::new(4.0, 6.0, 0.0))]);
        assert_eq!(asset.bounds.unwrap().max, Vec3::new(4.0, 6.0, 0.0));
    }

    #[test]
    fn test_closed_lwpolyline() {
        let dxf = drawing(
            "0\nLWPOLYLINE\n90\n3\n70\n1\n38\n2.5\n\
             10\n0\n20\n0\n10\n1\n20\n0\n10\n1\n20\n1\n",
        );
        let pairs = group_pairs(&dxf).unwrap();
        let entities = read_entities(&pairs).unwrap();

        let Entity::Polyline { points, closed } = &entities[0] else {
            panic!("expected polyline");
        };
        assert!(*closed);
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.z == 2.5));

        let mut batch = LineBatch::default();
        entities[0].tessellate(&mut batch);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_polyline_vertices_and_following_entity() {
        let dxf = drawing(
            "0\nPOLYLINE\n66\n1\n70\n0\n\
             0\nVERTEX\n10\n0\n20\n0\n0\nVERTEX\n10\n2\n20\n0\n0\nVERTEX\n10\n2\n20\n2\n\
             0\nSEQEND\n0\nLINE\n10\n5\n20\n5\n11\n6\n21\n6\n",
        );
        let pairs = group_pairs(&dxf).unwrap();
        let entities = read_entities(&pairs).unwrap();

        assert_eq!(entities.len(), 2);
        assert!(matches!(
            &entities[0],
            Entity::Polyline { points, closed: false } if points.len() == 3
        ));
        assert!(matches!(entities[1], Entity::Line { .. }));
    }

    #[test]
    fn test_circle_is_tessellated() {
        let dxf = drawing("0\nCIRCLE\n10\n0\n20\n0\n40\n2\n");
        let asset = DxfLoader.decode(dxf.as_bytes(), Path::new("c.dxf")).unwrap();
        let lines = asset.node.find_component::<LineBatch>().unwrap();
        assert_eq!(lines.len(), ARC_SEGMENTS);

        let bounds = asset.bounds.unwrap();
        assert!((bounds.max.x - 2.0).abs() < 1e-4);
        assert!((bounds.min.y + 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_arc_angles_wrap() {
        assert_eq!(arc_sweep(0.0, 360.0), (0.0, 360.0));
        assert_eq!(arc_sweep(350.0, 10.0), (350.0, 20.0));
        assert_eq!(arc_sweep(-90.0, 0.0), (270.0, 90.0));

        // 100000 turns are still one circle
        let dxf = drawing("0\nARC\n10\n0\n20\n0\n40\n1\n50\n0\n51\n36000000\n");
        let asset = DxfLoader.decode(dxf.as_bytes(), Path::new("a.dxf")).unwrap();
        let lines = asset.node.find_component::<LineBatch>().unwrap();
        assert!(lines.len() <= ARC_SEGMENTS);
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        for value in ["inf", "-inf", "NaN", "1e40"] {
            let dxf = drawing(&format!("0\nARC\n10\n0\n20\n0\n40\n1\n50\n0\n51\n{}\n", value));
            let err = DxfLoader.decode(dxf.as_bytes(), Path::new("a.dxf")).unwrap_err();
            assert!(matches!(err, LoadError::Decode { .. }), "{}", value);
        }
    }

    #[test]
    fn test_no_geometry_is_empty() {
        let dxf = drawing("0\nTEXT\n1\nhello\n");
        let err = DxfLoader.decode(dxf.as_bytes(), Path::new("t.dxf")).unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }

    #[test]
    fn test_binary_rejected() {
        let err = DxfLoader
            .decode(b"AutoCAD Binary DXF\r\n\x1a\x00", Path::new("b.dxf"))
            .unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }
}
