// Copyright @yucwang 2023

use crate::math::constants::{Float, Vector3f};

use std::fmt;
use std::fs;
use std::path::Path;

use wavefront_obj::{obj, ParseError};

#[derive(Debug)]
pub enum ObjLoadError {
    Io(std::io::Error),
    Parse(ParseError),
}

impl From<std::io::Error> for ObjLoadError {
    fn from(err: std::io::Error) -> Self {
        ObjLoadError::Io(err)
    }
}

impl From<ParseError> for ObjLoadError {
    fn from(err: ParseError) -> Self {
        ObjLoadError::Parse(err)
    }
}

impl fmt::Display for ObjLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjLoadError::Io(err) => write!(f, "io error: {}", err),
            ObjLoadError::Parse(err) => write!(f, "parse error: {}", err),
        }
    }
}

impl std::error::Error for ObjLoadError {}

pub fn load_obj_from_str<S: AsRef<str>>(input: S) -> Result<obj::ObjSet, ParseError> {
    let triangulated = triangulate_faces(input.as_ref());
    obj::parse(triangulated)
}

pub fn load_obj_from_file<P: AsRef<Path>>(path: P) -> Result<obj::ObjSet, ObjLoadError> {
    let data = fs::read_to_string(path)?;
    let obj_set = load_obj_from_str(data)?;
    Ok(obj_set)
}

/// Vertex triples of every triangle in the set, winding preserved. Points and
/// lines are skipped.
pub fn obj_triangles(obj_set: &obj::ObjSet) -> Vec<[Vector3f; 3]> {
    let mut triangles = Vec::new();
    for object in &obj_set.objects {
        let vertex = |idx: usize| {
            let v = object.vertices[idx];
            Vector3f::new(v.x as Float, v.y as Float, v.z as Float)
        };
        for geom in &object.geometry {
            for shape in &geom.shapes {
                if let obj::Primitive::Triangle(a, b, c) = shape.primitive {
                    triangles.push([vertex(a.0), vertex(b.0), vertex(c.0)]);
                }
            }
        }
    }
    triangles
}

/// Fans polygons with more than three corners into triangles.
fn triangulate_faces(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);
    for line in input.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("f ") || trimmed.starts_with("f\t") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() > 4 {
                let base = parts[1];
                for pair in parts[2..].windows(2) {
                    out.push_str("f ");
                    out.push_str(base);
                    out.push(' ');
                    out.push_str(pair[0]);
                    out.push(' ');
                    out.push_str(pair[1]);
                    out.push('\n');
                }
                continue;
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
