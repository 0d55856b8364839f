//! Scene renderer: static buffers for opaque materials, sorted per-primitive draws for translucent
//! ones.

use std::collections::BTreeMap;

use primbuf_api::{FrameView, GraphicsDevice, Material, MaterialId, PrimitiveSource, VertexLayout};

use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::layout::{pack_primitive, resolve_positions, validate_primitive};
use crate::static_geometry::StaticGeometryBuffer;
use crate::transparency::{SortOutcome, TranslucentEntry, TransparencySorter};

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub static_draws: usize,
    pub translucent_draws: usize,
    /// Material binds on the translucent path (consecutive same-material entries share one).
    pub material_switches: usize,
    pub sort: SortOutcome,
}

pub struct SceneRenderer<S: PrimitiveSource> {
    source: S,
    config: RendererConfig,
    static_buffers: BTreeMap<MaterialId, StaticGeometryBuffer>,
    sorter: TransparencySorter,
    released: bool,
}

impl<S: PrimitiveSource> SceneRenderer<S> {
    /// Validate the source, run its optimize pre-pass, upload one buffer per opaque material and
    /// collect the translucent primitives. On failure, buffers created so far are deleted again.
    pub fn new<D: GraphicsDevice + ?Sized>(device: &mut D, mut source: S, config: RendererConfig) -> Result<Self, RenderError> {
        Self::validate(&source)?;
        source.optimize();
        let max_layers = config.texture_layer_limit(device.max_texture_layers());
        let mut static_buffers = BTreeMap::new();
        let mut sorter = TransparencySorter::new(config.cardinal_tolerance);

        if let Err(err) = Self::build(device, &source, max_layers, &mut static_buffers, &mut sorter) {
            for buffer in static_buffers.values_mut() {
                if let Err(cleanup) = buffer.release(device) {
                    log::warn!("cleanup after failed scene build: {cleanup}");
                }
            }
            return Err(err);
        }

        log::info!(
            "scene ready: {} static buffers ({} vertices), {} translucent primitives",
            static_buffers.len(),
            static_buffers.values().map(|b| b.vertex_count() as u64).sum::<u64>(),
            sorter.len()
        );
        Ok(Self {
            source,
            config,
            static_buffers,
            sorter,
            released: false,
        })
    }

    /// Primitive indices in errors refer to the source as supplied, before optimize merges anything.
    fn validate(source: &S) -> Result<(), RenderError> {
        for material in source.materials() {
            for (index, primitive) in source.primitives(material.id).iter().enumerate() {
                validate_primitive(material, primitive)
                    .and_then(|()| resolve_positions(primitive, source).map(drop))
                    .map_err(|violation| RenderError::contract(material.id, index, violation))?;
            }
        }
        Ok(())
    }

    fn build<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        source: &S,
        max_layers: u32,
        static_buffers: &mut BTreeMap<MaterialId, StaticGeometryBuffer>,
        sorter: &mut TransparencySorter,
    ) -> Result<(), RenderError> {
        for material in source.materials() {
            let layers = material.texture_layer_count();
            if layers > max_layers as usize {
                return Err(RenderError::TooManyTextureLayers {
                    material: material.id,
                    layers,
                    max: max_layers,
                });
            }
            let primitives = source.primitives(material.id);
            if material.is_translucent() {
                for (index, primitive) in primitives.iter().enumerate() {
                    validate_primitive(material, primitive)
                        .and_then(|()| resolve_positions(primitive, source).map(drop))
                        .map_err(|violation| RenderError::contract(material.id, index, violation))?;
                    sorter.push(TranslucentEntry {
                        material: material.id,
                        primitive: index,
                    });
                }
            } else if primitives.is_empty() {
                log::warn!("{} ({}) has no primitives, no buffer created", material.id, material.name);
            } else {
                let buffer = StaticGeometryBuffer::build(device, material, primitives, source)?;
                if let Some(mut replaced) = static_buffers.insert(material.id, buffer) {
                    log::warn!("{} listed twice by the source, keeping the last", material.id);
                    replaced.release(device)?;
                }
            }
        }
        Ok(())
    }

    /// Draw one frame: every static buffer, then translucent primitives back-to-front.
    pub fn render<D: GraphicsDevice + ?Sized>(
        &mut self,
        device: &mut D,
        view: &FrameView,
    ) -> Result<FrameStats, RenderError> {
        if self.released {
            return Err(RenderError::SceneReleased);
        }
        for buffer in self.static_buffers.values() {
            buffer.draw(device)?;
        }

        let sort = self.sorter.sort(&self.source, &view.camera, &view.projection)?;

        let mut current: Option<&Material> = None;
        let mut material_switches = 0;
        let mut values = Vec::new();
        for entry in self.sorter.entries() {
            let material = match current {
                Some(material) if material.id == entry.material => material,
                _ => {
                    let material = self
                        .source
                        .material(entry.material)
                        .ok_or(RenderError::UnknownMaterial(entry.material))?;
                    device.bind_material(material)?;
                    material_switches += 1;
                    current = Some(material);
                    material
                }
            };
            let primitive = entry.resolve(&self.source)?;
            let layout = VertexLayout::for_texture_layers(material.texture_layer_count());
            values.clear();
            pack_primitive(&mut values, &layout, material, primitive, &self.source)
                .map_err(|violation| RenderError::contract(entry.material, entry.primitive, violation))?;
            let vertex_count = layout.vertex_count(values.len()) as u32;
            device.draw_vertices(&layout, bytemuck::cast_slice(&values), vertex_count)?;
        }

        let stats = FrameStats {
            static_draws: self.static_buffers.len(),
            translucent_draws: self.sorter.len(),
            material_switches,
            sort,
        };
        log::trace!("frame: {stats:?}");
        Ok(stats)
    }

    /// Delete every static buffer. Later calls do nothing; later renders fail.
    pub fn release<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> Result<(), RenderError> {
        if self.released {
            log::debug!("scene already released");
            return Ok(());
        }
        self.released = true;
        let mut first_error = None;
        for buffer in self.static_buffers.values_mut() {
            if let Err(err) = buffer.release(device) {
                log::warn!("release {}: {err}", buffer.material().id);
                first_error.get_or_insert(err);
            }
        }
        log::debug!("released {} static buffers", self.static_buffers.len());
        first_error.map_or(Ok(()), Err)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn static_buffer(&self, material: MaterialId) -> Option<&StaticGeometryBuffer> {
        self.static_buffers.get(&material)
    }

    pub fn static_buffers(&self) -> impl Iterator<Item = &StaticGeometryBuffer> {
        self.static_buffers.values()
    }

    /// Translucent entries in the order of the last sort.
    pub fn translucent_entries(&self) -> &[TranslucentEntry] {
        self.sorter.entries()
    }

    pub fn sorter(&self) -> &TransparencySorter {
        &self.sorter
    }
}
