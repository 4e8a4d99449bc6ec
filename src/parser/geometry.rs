//! `<geometry>`, `<mesh>` and primitive parsing
//!
//! Primitives keep their raw `<p>` lists until the mesh closes; the mesh
//! then splits each primitive's interleaved indices into one index list per
//! semantic. Vertex data is copied out of the mesh sources once per source,
//! so several primitives sharing a source share the values too.

use super::numbers::value_count;
use super::source::{Input, Source, find_source};
use super::{ElementParser, ElementStart, LoadContext, Parsed};
use crate::config::ObjectFlags;
use crate::error::{Error, Result};
use crate::model::{
    ClassId, Geometry, IndexList, Mesh, MeshPrimitive, PrimitiveKind, UniqueId, VertexSet,
};
use std::collections::HashMap;

/// `<vertices>` content
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Vertices {
    pub id: String,
    pub inputs: Vec<Input>,
}

/// A primitive element before index splitting
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawPrimitive {
    pub kind: PrimitiveKind,
    pub material: Option<String>,
    pub count: usize,
    pub inputs: Vec<Input>,
    pub vcount: Option<Vec<i64>>,
    /// One entry per `<p>`
    pub p: Vec<Vec<i64>>,
}

pub(crate) struct GeometryParser {
    geometry: Geometry,
}

impl GeometryParser {
    pub fn new(start: &ElementStart<'_>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        let unique_id = ctx.define_object(start, ClassId::Geometry)?;
        Ok(Self {
            geometry: Geometry {
                unique_id,
                original_id: start.attr_string("id"),
                name: start.attr_string("name"),
                mesh: None,
            },
        })
    }
}

impl ElementParser for GeometryParser {
    fn attach(&mut self, child: Parsed, ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Mesh(mut mesh) = child {
            for primitive in &mut mesh.primitives {
                if let Some(symbol) = &primitive.material_symbol {
                    primitive.material_id = ctx.store.material_id(self.geometry.unique_id, symbol);
                }
            }
            self.geometry.mesh = Some(mesh);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        if ctx.wants(ObjectFlags::GEOMETRY) {
            tracing::debug!(id = %self.geometry.unique_id, "writing geometry");
            let ok = ctx.writer.write_geometry(self.geometry);
            ctx.check_written(ok, "geometry")?;
        }
        Ok(Parsed::None)
    }

    fn object_id(&self) -> Option<UniqueId> {
        Some(self.geometry.unique_id)
    }
}

/// Vertex data a semantic maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    Position,
    Normal,
    Tangent,
    Binormal,
    Color,
    Uv,
}

impl Channel {
    fn from_semantic(semantic: &str) -> Option<Self> {
        match semantic {
            "POSITION" => Some(Channel::Position),
            "NORMAL" => Some(Channel::Normal),
            "TANGENT" | "TEXTANGENT" => Some(Channel::Tangent),
            "BINORMAL" | "TEXBINORMAL" => Some(Channel::Binormal),
            "COLOR" => Some(Channel::Color),
            "TEXCOORD" => Some(Channel::Uv),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Channel::Position => "POSITION",
            Channel::Normal => "NORMAL",
            Channel::Tangent => "TANGENT",
            Channel::Binormal => "BINORMAL",
            Channel::Color => "COLOR",
            Channel::Uv => "TEXCOORD",
        }
    }
}

/// One index stream of a primitive
struct Stream {
    channel: Channel,
    source: String,
    offset: usize,
    set: Option<u32>,
}

/// Where a loaded source ended up
#[derive(Debug, Clone, Copy)]
struct Loaded {
    /// Element offset for single sets, set index for colors and uvs
    slot: usize,
    count: usize,
}

#[derive(Default)]
pub(crate) struct MeshParser {
    sources: Vec<Source>,
    vertices: Option<Vertices>,
    mesh: Mesh,
    loaded: HashMap<(Channel, String), Loaded>,
}

impl MeshParser {
    /// Copy a source into the mesh unless done already
    fn load(&mut self, channel: Channel, reference: &str) -> Result<Loaded> {
        let source = find_source(&self.sources, reference)?;
        let key = (channel, source.id.clone());
        if let Some(&loaded) = self.loaded.get(&key) {
            return Ok(loaded);
        }
        let values = source.floats(channel.name())?;
        let count = source.count();
        let loaded = match channel {
            Channel::Color | Channel::Uv => {
                let sets = if channel == Channel::Color {
                    &mut self.mesh.colors
                } else {
                    &mut self.mesh.uv_coords
                };
                sets.push(VertexSet {
                    source: Some(source.id.clone()),
                    stride: source.stride,
                    values: values.to_vec(),
                });
                Loaded {
                    slot: sets.len() - 1,
                    count,
                }
            }
            Channel::Position | Channel::Normal | Channel::Tangent | Channel::Binormal => {
                let set = match channel {
                    Channel::Position => &mut self.mesh.positions,
                    Channel::Normal => &mut self.mesh.normals,
                    Channel::Tangent => &mut self.mesh.tangents,
                    _ => &mut self.mesh.binormals,
                };
                if set.values.is_empty() {
                    set.stride = source.stride;
                    set.source = Some(source.id.clone());
                } else if set.stride != source.stride {
                    return Err(Error::InvalidModel(format!(
                        "{} sources of one mesh differ in stride ({} and {})",
                        channel.name(),
                        set.stride,
                        source.stride
                    )));
                }
                let offset = set.len();
                set.values.extend_from_slice(values);
                Loaded {
                    slot: offset,
                    count,
                }
            }
        };
        self.loaded.insert(key, loaded);
        Ok(loaded)
    }

    /// Index streams of a primitive, with `VERTEX` expanded
    fn streams(&self, raw: &RawPrimitive) -> Result<Vec<Stream>> {
        let mut streams = Vec::new();
        for input in &raw.inputs {
            if input.semantic == "VERTEX" {
                let vertices = self.vertices.as_ref().ok_or_else(|| {
                    Error::InvalidModel("primitive references <vertices> before it".to_string())
                })?;
                if input.source.trim_start_matches('#') != vertices.id {
                    return Err(Error::InvalidModel(format!(
                        "VERTEX input refers to '{}', mesh vertices are '{}'",
                        input.source, vertices.id
                    )));
                }
                for vertex_input in &vertices.inputs {
                    if let Some(channel) = Channel::from_semantic(&vertex_input.semantic) {
                        streams.push(Stream {
                            channel,
                            source: vertex_input.source.clone(),
                            offset: input.offset,
                            set: vertex_input.set.or(input.set),
                        });
                    }
                }
            } else if let Some(channel) = Channel::from_semantic(&input.semantic) {
                streams.push(Stream {
                    channel,
                    source: input.source.clone(),
                    offset: input.offset,
                    set: input.set,
                });
            } else {
                tracing::trace!(semantic = %input.semantic, "ignoring primitive input");
            }
        }
        Ok(streams)
    }

    /// Split a raw primitive into per-semantic index lists
    fn assemble(&mut self, raw: RawPrimitive) -> Result<MeshPrimitive> {
        let mut primitive = MeshPrimitive::new(raw.kind);
        primitive.material_symbol = raw.material.clone();

        let stride = raw.inputs.iter().map(|i| i.offset.saturating_add(1)).max().unwrap_or(0);
        let indices: Vec<i64> = raw.p.iter().flatten().copied().collect();
        if stride == 0 {
            if raw.count > 0 || !indices.is_empty() {
                return Err(Error::InvalidModel(format!(
                    "primitive with count=\"{}\" has no inputs",
                    raw.count
                )));
            }
            return Ok(primitive);
        }
        if indices.len() % stride != 0 {
            return Err(Error::InvalidModel(format!(
                "{} indices do not split into vertices of {} inputs",
                indices.len(),
                stride
            )));
        }
        let vertex_count = indices.len() / stride;

        match raw.kind {
            PrimitiveKind::Lines | PrimitiveKind::Triangles => {
                let size = raw.kind.fixed_face_size().unwrap_or(1);
                if vertex_count != value_count("primitive", raw.count, size)? {
                    return Err(Error::InvalidModel(format!(
                        "primitive declares {} faces of {} vertices but holds {} vertices",
                        raw.count, size, vertex_count
                    )));
                }
                primitive.face_count = raw.count;
            }
            PrimitiveKind::Polylist => {
                let vcount = raw.vcount.as_deref().unwrap_or(&[]);
                if vcount.len() != raw.count {
                    return Err(Error::InvalidModel(format!(
                        "<polylist> declares {} faces, <vcount> holds {}",
                        raw.count,
                        vcount.len()
                    )));
                }
                let mut counts = Vec::with_capacity(vcount.len());
                for &n in vcount {
                    counts.push(u32::try_from(n).map_err(|_| {
                        Error::parse_error_with_context("vcount value", &n.to_string(), "u32")
                    })?);
                }
                let total: usize = counts.iter().map(|&n| n as usize).sum();
                if total != vertex_count {
                    return Err(Error::InvalidModel(format!(
                        "<vcount> sums to {} vertices, <p> holds {}",
                        total, vertex_count
                    )));
                }
                primitive.face_count = counts.len();
                primitive.face_vertex_counts = counts;
            }
            PrimitiveKind::Polygons
            | PrimitiveKind::LineStrips
            | PrimitiveKind::TriFans
            | PrimitiveKind::TriStrips => {
                if raw.p.len() != raw.count {
                    return Err(Error::InvalidModel(format!(
                        "primitive declares {} faces but holds {} <p>",
                        raw.count,
                        raw.p.len()
                    )));
                }
                let mut counts = Vec::with_capacity(raw.p.len());
                for p in &raw.p {
                    if p.len() % stride != 0 {
                        return Err(Error::InvalidModel(format!(
                            "<p> with {} indices does not split into vertices of {} inputs",
                            p.len(),
                            stride
                        )));
                    }
                    counts.push((p.len() / stride) as u32);
                }
                primitive.face_count = counts.len();
                primitive.face_vertex_counts = counts;
            }
        }

        for stream in self.streams(&raw)? {
            let loaded = self.load(stream.channel, &stream.source)?;
            let base = match stream.channel {
                Channel::Color | Channel::Uv => 0,
                _ => loaded.slot,
            };
            let mut list = Vec::with_capacity(vertex_count);
            for vertex in indices.chunks_exact(stride) {
                let index = vertex[stream.offset];
                if index < 0 || index as usize >= loaded.count {
                    return Err(Error::InvalidModel(format!(
                        "{} index {} out of range for source '{}' with {} elements",
                        stream.channel.name(),
                        index,
                        stream.source,
                        loaded.count
                    )));
                }
                list.push((base + index as usize) as u32);
            }
            match stream.channel {
                Channel::Position => primitive.position_indices = list,
                Channel::Normal => primitive.normal_indices = list,
                Channel::Tangent => primitive.tangent_indices = list,
                Channel::Binormal => primitive.binormal_indices = list,
                Channel::Color => primitive.color_indices.push(IndexList {
                    set_index: loaded.slot,
                    set: stream.set,
                    indices: list,
                }),
                Channel::Uv => primitive.uv_indices.push(IndexList {
                    set_index: loaded.slot,
                    set: stream.set,
                    indices: list,
                }),
            }
        }
        if primitive.position_indices.len() != vertex_count {
            return Err(Error::InvalidModel(
                "primitive has no POSITION data".to_string(),
            ));
        }
        Ok(primitive)
    }
}

impl ElementParser for MeshParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Source(source) => self.sources.push(source),
            Parsed::Vertices(vertices) => self.vertices = Some(vertices),
            Parsed::Primitive(raw) => {
                let primitive = self.assemble(raw)?;
                self.mesh.primitives.push(primitive);
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Mesh(self.mesh))
    }
}

pub(crate) struct VerticesParser {
    vertices: Vertices,
}

impl VerticesParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        Ok(Self {
            vertices: Vertices {
                id: start.required("id")?.to_string(),
                inputs: Vec::new(),
            },
        })
    }
}

impl ElementParser for VerticesParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        if let Parsed::Input(input) = child {
            self.vertices.inputs.push(input);
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Vertices(self.vertices))
    }
}

pub(crate) struct PrimitiveParser {
    raw: RawPrimitive,
}

impl PrimitiveParser {
    pub fn new(start: &ElementStart<'_>) -> Result<Self> {
        let kind = PrimitiveKind::from_element(start.name).ok_or_else(|| {
            Error::InvalidModel(format!("<{}> is not a mesh primitive", start.name))
        })?;
        Ok(Self {
            raw: RawPrimitive {
                kind,
                material: start.attr_string("material"),
                count: start.attr_usize("count")?.unwrap_or(0),
                inputs: Vec::new(),
                vcount: None,
                p: Vec::new(),
            },
        })
    }
}

impl ElementParser for PrimitiveParser {
    fn attach(&mut self, child: Parsed, _ctx: &mut LoadContext<'_>) -> Result<()> {
        match child {
            Parsed::Input(input) => self.raw.inputs.push(input),
            Parsed::Indices { name, values } => {
                if name == "vcount" {
                    self.raw.vcount = Some(values);
                } else {
                    self.raw.p.push(values);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self: Box<Self>, _ctx: &mut LoadContext<'_>) -> Result<Parsed> {
        Ok(Parsed::Primitive(self.raw))
    }
}
