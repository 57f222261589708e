// Copyright @yucwang 2026

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::core::bsdf::BSDF;
use crate::core::scene::{Scene, SceneObject};
use crate::core::shape::Shape;
use crate::io::obj_utils::ObjLoadError;
use crate::materials::lambertian_diffuse::LambertianDiffuseBSDF;
use crate::math::constants::{Float, Vector3f};
use crate::math::spectrum::RGBSpectrum;
use crate::sensors::perspective::PerspectiveCamera;
use crate::shapes::triangle::Triangle;
use crate::shapes::triangle_mesh::TriangleMesh;

#[derive(Debug)]
pub enum SceneLoadError {
    Io(std::io::Error),
    Xml(quick_xml::Error),
    Parse(String),
    MissingField(&'static str),
    Obj(ObjLoadError),
}

impl From<std::io::Error> for SceneLoadError {
    fn from(err: std::io::Error) -> Self {
        SceneLoadError::Io(err)
    }
}

impl From<quick_xml::Error> for SceneLoadError {
    fn from(err: quick_xml::Error) -> Self {
        SceneLoadError::Xml(err)
    }
}

impl From<ObjLoadError> for SceneLoadError {
    fn from(err: ObjLoadError) -> Self {
        SceneLoadError::Obj(err)
    }
}

impl fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneLoadError::Io(err) => write!(f, "io error: {}", err),
            SceneLoadError::Xml(err) => write!(f, "xml error: {}", err),
            SceneLoadError::Parse(msg) => write!(f, "parse error: {}", msg),
            SceneLoadError::MissingField(field) => write!(f, "missing field: {}", field),
            SceneLoadError::Obj(err) => write!(f, "obj error: {}", err),
        }
    }
}

impl std::error::Error for SceneLoadError {}

pub struct SceneLoadResult {
    pub scene: Scene,
    pub camera: Option<PerspectiveCamera>,
    pub samples_per_pixel: Option<u32>,
    pub max_depth: Option<u32>,
    pub rr_probability: Option<Float>,
}

/// Parses a scene file. Relative mesh paths resolve against the file's
/// directory. The BVH is not built; call `Scene::build_bvh` once the split
/// method is settled.
pub fn load_scene_with_settings<P: AsRef<Path>>(path: P) -> Result<SceneLoadResult, SceneLoadError> {
    let path = path.as_ref();
    let xml = fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    log::info!("Loading scene from {}.", path.display());
    parse_scene(&xml, base_dir)
}

pub fn parse_scene(xml: &str, base_dir: &Path) -> Result<SceneLoadResult, SceneLoadError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut parser = SceneParser::new(base_dir);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => parser.start(&e)?,
            Event::Empty(e) => {
                parser.start(&e)?;
                parser.end(e.name().as_ref())?;
            }
            Event::End(e) => parser.end(e.name().as_ref())?,
            _ => {}
        }
        buf.clear();
    }

    let result = parser.finish();
    let emitter_count = result.scene.objects().iter().filter(|o| o.has_emit()).count();
    log::info!("Scene parsed: {} objects, {} emissive.", result.scene.len(), emitter_count);
    if emitter_count == 0 && !result.scene.is_empty() {
        log::warn!("Scene has no emissive objects, the render will be black.");
    }
    Ok(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Integrator,
    Sensor,
    Bsdf,
    Shape,
}

#[derive(Default)]
struct SensorState {
    fov: Option<Float>,
    origin: Option<Vector3f>,
    target: Option<Vector3f>,
    up: Option<Vector3f>,
    width: Option<usize>,
    height: Option<usize>,
}

#[derive(Default)]
struct BsdfState {
    id: Option<String>,
    reflectance: Option<RGBSpectrum>,
}

#[derive(Default)]
struct ShapeState {
    kind: String,
    filename: Option<String>,
    points: [Option<Vector3f>; 3],
    bsdf_ref: Option<String>,
    has_emitter: bool,
    in_emitter: bool,
    radiance: Option<RGBSpectrum>,
}

struct SceneParser {
    base_dir: PathBuf,
    defaults: HashMap<String, String>,
    bsdfs: HashMap<String, Arc<dyn BSDF>>,
    section: Section,
    sensor: SensorState,
    bsdf: BsdfState,
    shape: ShapeState,
    scene: Scene,
    camera: Option<PerspectiveCamera>,
    samples_per_pixel: Option<u32>,
    max_depth: Option<u32>,
    rr_probability: Option<Float>,
}

impl SceneParser {
    fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            defaults: HashMap::new(),
            bsdfs: HashMap::new(),
            section: Section::Root,
            sensor: SensorState::default(),
            bsdf: BsdfState::default(),
            shape: ShapeState::default(),
            scene: Scene::new(),
            camera: None,
            samples_per_pixel: None,
            max_depth: None,
            rr_probability: None,
        }
    }

    fn finish(self) -> SceneLoadResult {
        SceneLoadResult {
            scene: self.scene,
            camera: self.camera,
            samples_per_pixel: self.samples_per_pixel,
            max_depth: self.max_depth,
            rr_probability: self.rr_probability,
        }
    }

    fn attributes(&self, e: &BytesStart) -> Result<HashMap<String, String>, SceneLoadError> {
        let mut attrs = HashMap::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = resolve_value(&attr.unescape_value()?, &self.defaults);
            attrs.insert(key, value);
        }
        Ok(attrs)
    }

    fn start(&mut self, e: &BytesStart) -> Result<(), SceneLoadError> {
        let attrs = self.attributes(e)?;
        let kind = attrs.get("type").map(String::as_str);

        match e.name().as_ref() {
            b"scene" | b"film" | b"transform" => {}
            b"default" => {
                if let (Some(k), Some(v)) = (attrs.get("name"), attrs.get("value")) {
                    self.defaults.insert(k.clone(), v.clone());
                }
            }
            b"integrator" => {
                if kind != Some("path") {
                    return Err(SceneLoadError::Parse(format!("unsupported integrator: {}", kind.unwrap_or(""))));
                }
                self.section = Section::Integrator;
            }
            b"sensor" => {
                if kind != Some("perspective") {
                    return Err(SceneLoadError::Parse(format!("unsupported sensor: {}", kind.unwrap_or(""))));
                }
                self.section = Section::Sensor;
                self.sensor = SensorState::default();
            }
            b"lookat" if self.section == Section::Sensor => {
                self.sensor.origin = attrs.get("origin").map(|v| parse_vec3(v)).transpose()?;
                self.sensor.target = attrs.get("target").map(|v| parse_vec3(v)).transpose()?;
                self.sensor.up = attrs.get("up").map(|v| parse_vec3(v)).transpose()?;
            }
            b"bsdf" => {
                if kind != Some("diffuse") {
                    return Err(SceneLoadError::Parse(format!("unsupported bsdf: {}", kind.unwrap_or(""))));
                }
                self.section = Section::Bsdf;
                self.bsdf = BsdfState { id: attrs.get("id").cloned(), reflectance: None };
            }
            b"shape" => {
                match kind {
                    Some("obj") | Some("triangle") => {}
                    _ => return Err(SceneLoadError::Parse(format!("unsupported shape: {}", kind.unwrap_or("")))),
                }
                self.section = Section::Shape;
                self.shape = ShapeState { kind: kind.unwrap_or_default().to_string(), ..ShapeState::default() };
            }
            b"ref" if self.section == Section::Shape => {
                self.shape.bsdf_ref = attrs.get("id").cloned();
            }
            b"emitter" => {
                if self.section != Section::Shape {
                    return Err(SceneLoadError::Parse(String::from("emitters must be attached to a shape")));
                }
                if kind != Some("area") {
                    return Err(SceneLoadError::Parse(format!("unsupported emitter: {}", kind.unwrap_or(""))));
                }
                self.shape.has_emitter = true;
                self.shape.in_emitter = true;
            }
            b"integer" | b"float" | b"string" | b"point" | b"vector" | b"rgb" => {
                self.property(&attrs)?;
            }
            other => {
                log::warn!("Ignoring unsupported element <{}>.", String::from_utf8_lossy(other));
            }
        }
        Ok(())
    }

    fn property(&mut self, attrs: &HashMap<String, String>) -> Result<(), SceneLoadError> {
        let name = attrs.get("name").ok_or(SceneLoadError::MissingField("property.name"))?;
        let value = || attrs.get("value").map(String::as_str).ok_or(SceneLoadError::MissingField("property.value"));

        match (self.section, name.as_str()) {
            (Section::Integrator, "max_depth") => self.max_depth = Some(parse_u32(value()?)?),
            (Section::Integrator, "spp") | (Section::Integrator, "sample_count") => {
                self.samples_per_pixel = Some(parse_u32(value()?)?)
            }
            (Section::Integrator, "rr_probability") => self.rr_probability = Some(parse_float(value()?)?),
            (Section::Sensor, "fov") => self.sensor.fov = Some(parse_float(value()?)?),
            (Section::Sensor, "origin") => self.sensor.origin = Some(vec3_property(attrs)?),
            (Section::Sensor, "target") => self.sensor.target = Some(vec3_property(attrs)?),
            (Section::Sensor, "up") => self.sensor.up = Some(vec3_property(attrs)?),
            (Section::Sensor, "width") => self.sensor.width = Some(parse_usize(value()?)?),
            (Section::Sensor, "height") => self.sensor.height = Some(parse_usize(value()?)?),
            (Section::Bsdf, "reflectance") => self.bsdf.reflectance = Some(parse_vec3_spectrum(value()?)?),
            (Section::Shape, "radiance") if self.shape.in_emitter => {
                self.shape.radiance = Some(parse_vec3_spectrum(value()?)?)
            }
            (Section::Shape, "filename") => self.shape.filename = Some(value()?.to_string()),
            (Section::Shape, "p0") => self.shape.points[0] = Some(vec3_property(attrs)?),
            (Section::Shape, "p1") => self.shape.points[1] = Some(vec3_property(attrs)?),
            (Section::Shape, "p2") => self.shape.points[2] = Some(vec3_property(attrs)?),
            (section, name) => log::warn!("Ignoring property '{}' in {:?}.", name, section),
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) -> Result<(), SceneLoadError> {
        match name {
            b"integrator" => self.section = Section::Root,
            b"sensor" => {
                self.finish_sensor()?;
                self.section = Section::Root;
            }
            b"bsdf" => {
                self.finish_bsdf()?;
                self.section = Section::Root;
            }
            b"emitter" => self.shape.in_emitter = false,
            b"shape" => {
                self.finish_shape()?;
                self.section = Section::Root;
            }
            _ => {}
        }
        Ok(())
    }

    fn finish_sensor(&mut self) -> Result<(), SceneLoadError> {
        let sensor = std::mem::take(&mut self.sensor);
        let camera = PerspectiveCamera::new(
            sensor.origin.ok_or(SceneLoadError::MissingField("sensor.origin"))?,
            sensor.target.ok_or(SceneLoadError::MissingField("sensor.target"))?,
            sensor.up.unwrap_or_else(|| Vector3f::new(0.0, 1.0, 0.0)),
            sensor.fov.ok_or(SceneLoadError::MissingField("sensor.fov"))?,
            sensor.width.ok_or(SceneLoadError::MissingField("sensor.width"))?,
            sensor.height.ok_or(SceneLoadError::MissingField("sensor.height"))?,
        );
        if self.camera.is_some() {
            log::warn!("Multiple sensors in scene, keeping the last one.");
        }
        self.camera = Some(camera);
        Ok(())
    }

    fn finish_bsdf(&mut self) -> Result<(), SceneLoadError> {
        let bsdf = std::mem::take(&mut self.bsdf);
        let id = bsdf.id.ok_or(SceneLoadError::MissingField("bsdf.id"))?;
        let reflectance = bsdf.reflectance.unwrap_or_else(|| RGBSpectrum::splat(0.5));
        self.bsdfs.insert(id, Arc::new(LambertianDiffuseBSDF::new(reflectance)));
        Ok(())
    }

    fn finish_shape(&mut self) -> Result<(), SceneLoadError> {
        let shape_state = std::mem::take(&mut self.shape);
        let bsdf_id = shape_state.bsdf_ref.ok_or(SceneLoadError::MissingField("shape.ref"))?;
        let material = self
            .bsdfs
            .get(&bsdf_id)
            .ok_or_else(|| SceneLoadError::Parse(format!("unknown bsdf reference: {}", bsdf_id)))?
            .clone();

        let shape: Arc<dyn Shape> = if shape_state.kind == "obj" {
            let filename = shape_state.filename.ok_or(SceneLoadError::MissingField("shape.filename"))?;
            let path = if Path::new(&filename).is_absolute() {
                PathBuf::from(filename)
            } else {
                self.base_dir.join(filename)
            };
            Arc::new(TriangleMesh::from_obj(&path)?)
        } else {
            let [p0, p1, p2] = shape_state.points;
            Arc::new(Triangle::new(
                p0.ok_or(SceneLoadError::MissingField("shape.p0"))?,
                p1.ok_or(SceneLoadError::MissingField("shape.p1"))?,
                p2.ok_or(SceneLoadError::MissingField("shape.p2"))?,
            ))
        };

        let object = if shape_state.has_emitter {
            let radiance = shape_state.radiance.ok_or(SceneLoadError::MissingField("emitter.radiance"))?;
            SceneObject::with_emission(shape, material, radiance)
        } else {
            SceneObject::new(shape, material)
        };
        self.scene.add_object(object);
        Ok(())
    }
}

/// Substitutes `$name` references declared by `<default>` elements.
fn resolve_value(raw: &str, defaults: &HashMap<String, String>) -> String {
    let mut out = raw.to_string();
    for (k, v) in defaults {
        out = out.replace(&format!("${}", k), v);
    }
    out
}

fn parse_float(value: &str) -> Result<Float, SceneLoadError> {
    value.trim().parse::<Float>().map_err(|_| SceneLoadError::Parse(format!("invalid float: {}", value)))
}

fn parse_u32(value: &str) -> Result<u32, SceneLoadError> {
    value.trim().parse::<u32>().map_err(|_| SceneLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_usize(value: &str) -> Result<usize, SceneLoadError> {
    value.trim().parse::<usize>().map_err(|_| SceneLoadError::Parse(format!("invalid integer: {}", value)))
}

fn parse_vec3(value: &str) -> Result<Vector3f, SceneLoadError> {
    let mut parts = value.split(',').map(|s| s.trim()).filter(|s| !s.is_empty());
    let mut next = || parts.next().ok_or_else(|| SceneLoadError::Parse(format!("invalid vec3: {}", value)));
    let (x, y, z) = (next()?, next()?, next()?);
    Ok(Vector3f::new(parse_float(x)?, parse_float(y)?, parse_float(z)?))
}

/// `value="x, y, z"` or separate `x`, `y`, `z` attributes.
fn vec3_property(attrs: &HashMap<String, String>) -> Result<Vector3f, SceneLoadError> {
    if let Some(value) = attrs.get("value") {
        return parse_vec3(value);
    }
    let component = |key: &str| match attrs.get(key) {
        Some(v) => parse_float(v),
        None => Ok(0.0),
    };
    Ok(Vector3f::new(component("x")?, component("y")?, component("z")?))
}

fn parse_vec3_spectrum(value: &str) -> Result<RGBSpectrum, SceneLoadError> {
    let v = parse_vec3(value)?;
    Ok(RGBSpectrum::from_vector(v))
}
