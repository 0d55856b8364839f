//! wgpu implementation of [`GraphicsDevice`].
//!
//! Draw calls are recorded between [`WgpuDevice::begin_frame`] and [`WgpuDevice::end_frame`] and
//! encoded, in call order, into a single render pass over the offscreen color and depth targets.

mod pipeline;
mod resources;

use std::collections::HashMap;
use std::sync::Arc;

use primbuf_api::{
    to_device_space, BufferId, DeviceError, FrameView, GraphicsDevice, Material, MaterialId, TextureId, Transparency,
    VertexLayout,
};

use crate::config::RendererConfig;

pub use pipeline::{material_uniform_size, shader_source, vertex_attributes, PipelineCache, PipelineKey};
pub use resources::FrameTargets;

/// Size of the per-frame uniform: view-projection, light direction, light color.
const GLOBALS_SIZE: u64 = std::mem::size_of::<GlobalsUniform>() as u64;
const DEFAULT_LIGHT: ([f32; 3], [f32; 3]) = ([0.3, -0.8, 0.5], [1.0, 1.0, 1.0]);
/// Alpha below which `Binary` materials discard fragments.
const BINARY_ALPHA_CUTOFF: f32 = 0.5;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GlobalsUniform {
    view_proj: [f32; 16],
    light_dir: [f32; 4],
    light_color: [f32; 4],
}

#[derive(Clone)]
struct BoundMaterial {
    key: PipelineKey,
    bind_group: Arc<wgpu::BindGroup>,
}

/// Bind group built for a material, reused while its parameters and texture views are unchanged.
struct CachedMaterial {
    bound: BoundMaterial,
    params: Vec<f32>,
    views: Vec<Arc<wgpu::TextureView>>,
}

impl CachedMaterial {
    fn matches(&self, key: PipelineKey, params: &[f32], views: &[Arc<wgpu::TextureView>]) -> bool {
        self.bound.key == key
            && self.params == params
            && self.views.len() == views.len()
            && self.views.iter().zip(views).all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

struct RecordedDraw {
    pipeline: PipelineKey,
    material: Arc<wgpu::BindGroup>,
    vertices: Arc<wgpu::Buffer>,
    vertex_count: u32,
}

#[derive(Default)]
struct FrameState {
    draws: Vec<RecordedDraw>,
    transient_bytes: u64,
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    clear_color: wgpu::Color,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    max_texture_layers: u32,
    pipelines: PipelineCache,
    globals_buf: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    default_texture: Arc<wgpu::TextureView>,
    textures: HashMap<TextureId, Arc<wgpu::TextureView>>,
    buffers: HashMap<BufferId, Arc<wgpu::Buffer>>,
    next_buffer: u64,
    materials: HashMap<MaterialId, CachedMaterial>,
    material_bind_groups_created: u64,
    bound: Option<BoundMaterial>,
    frame: Option<FrameState>,
    targets: Option<FrameTargets>,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, config: &RendererConfig) -> Result<Self, DeviceError> {
        let adapter_limit = device.limits().max_sampled_textures_per_shader_stage;
        let max_texture_layers = config.device_max_texture_layers.min(adapter_limit);
        let pipelines = PipelineCache::new(&device, config.color_format, config.depth_format);

        let globals_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("primbuf_globals"),
            size: GLOBALS_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("primbuf_globals_bg"),
            layout: pipelines.globals_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buf.as_entire_binding(),
            }],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("primbuf_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let default_texture = Arc::new(create_rgba8_texture(&device, &queue, "primbuf_default_texture", 1, 1, &[255; 4]));

        let [r, g, b, a] = config.clear_color;
        log::info!(
            "wgpu device ready: {} texture layers (adapter allows {}), color {:?}, depth {:?}",
            max_texture_layers,
            adapter_limit,
            config.color_format,
            config.depth_format
        );
        Ok(Self {
            device,
            queue,
            clear_color: wgpu::Color { r, g, b, a },
            color_format: config.color_format,
            depth_format: config.depth_format,
            max_texture_layers,
            pipelines,
            globals_buf,
            globals_bind_group,
            sampler,
            default_texture,
            textures: HashMap::new(),
            buffers: HashMap::new(),
            next_buffer: 1,
            materials: HashMap::new(),
            material_bind_groups_created: 0,
            bound: None,
            frame: None,
            targets: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device { &self.device }
    pub fn queue(&self) -> &wgpu::Queue { &self.queue }

    /// Color target of the last frame, if any frame has been rendered.
    pub fn color_target(&self) -> Option<&wgpu::Texture> {
        self.targets.as_ref().map(|t| &t.color)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Material bind groups built so far; binding an unchanged material reuses its cached group.
    pub fn material_bind_groups_created(&self) -> u64 {
        self.material_bind_groups_created
    }

    /// Register a texture view for materials referencing `id`. Unknown ids sample white.
    pub fn insert_texture(&mut self, id: TextureId, view: wgpu::TextureView) {
        self.textures.insert(id, Arc::new(view));
    }

    /// Upload tightly packed RGBA8 pixels as texture `id`.
    pub fn upload_texture_rgba8(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]) -> Result<(), DeviceError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(DeviceError::Backend(format!(
                "texture {id:?}: {} bytes for {width}x{height} RGBA8",
                pixels.len()
            )));
        }
        let view = create_rgba8_texture(&self.device, &self.queue, "primbuf_texture", width, height, pixels);
        self.insert_texture(id, view);
        Ok(())
    }

    /// Start recording a frame for `view`: resize targets and upload the per-frame uniform.
    pub fn begin_frame(&mut self, view: &FrameView) -> Result<(), DeviceError> {
        if self.frame.is_some() {
            log::warn!("begin_frame while a frame is active, previous draws discarded");
        }
        let (width, height) = view.viewport_size;
        let existing = self.targets.take();
        self.targets = Some(FrameTargets::ensure_size(
            &self.device,
            existing,
            width,
            height,
            self.color_format,
            self.depth_format,
        )?);

        let (direction, color) = view.directional_light.unwrap_or(DEFAULT_LIGHT);
        let direction = to_device_space(direction.into());
        let globals = GlobalsUniform {
            view_proj: view.view_proj(),
            light_dir: [direction.x, direction.y, direction.z, 0.0],
            light_color: [color[0], color[1], color[2], 1.0],
        };
        self.queue.write_buffer(&self.globals_buf, 0, bytemuck::bytes_of(&globals));
        self.bound = None;
        self.frame = Some(FrameState::default());
        Ok(())
    }

    /// Encode every recorded draw into one render pass and submit it. Returns the draw count.
    pub fn end_frame(&mut self) -> Result<usize, DeviceError> {
        let frame = self.frame.take().ok_or(DeviceError::NoActiveFrame)?;
        self.bound = None;
        let targets = self.targets.as_ref().ok_or(DeviceError::NoActiveFrame)?;
        let color_view = targets.color_view();
        let depth_view = targets.depth_view();
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("primbuf_frame"),
        });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("primbuf_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_viewport(0.0, 0.0, targets.width() as f32, targets.height() as f32, 0.0, 1.0);
            rp.set_bind_group(0, &self.globals_bind_group, &[]);
            let mut current = None;
            for draw in &frame.draws {
                if current != Some(draw.pipeline) {
                    let pipeline = self.pipelines.get(draw.pipeline).ok_or_else(|| {
                        DeviceError::Backend(format!("no pipeline for {:?}", draw.pipeline))
                    })?;
                    rp.set_pipeline(pipeline);
                    current = Some(draw.pipeline);
                }
                rp.set_bind_group(1, &*draw.material, &[]);
                rp.set_vertex_buffer(0, draw.vertices.slice(..));
                rp.draw(0..draw.vertex_count, 0..1);
            }
        }
        self.queue.submit([encoder.finish()]);
        log::trace!(
            "frame submitted: {} draws, {} transient bytes",
            frame.draws.len(),
            frame.transient_bytes
        );
        Ok(frame.draws.len())
    }

    /// Drop the recorded draws of the active frame without submitting anything.
    pub fn abort_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            log::debug!("frame aborted, {} recorded draws dropped", frame.draws.len());
        }
        self.bound = None;
    }

    /// Copy the color target back to the CPU as tightly packed rows. Only 4-byte formats.
    pub fn read_color_rgba8(&self) -> Result<Vec<u8>, DeviceError> {
        let targets = self
            .targets
            .as_ref()
            .ok_or_else(|| DeviceError::Backend("no frame rendered yet".to_string()))?;
        if self.color_format.block_copy_size(None) != Some(4) {
            return Err(DeviceError::Backend(format!(
                "readback of {:?} is not supported",
                self.color_format
            )));
        }
        let (width, height) = (targets.width(), targets.height());
        let row = width * 4;
        let padded_row = row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("primbuf_readback"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("primbuf_readback"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &targets.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.queue.submit([encoder.finish()]);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let polled = self.device.poll(wgpu::Maintain::Wait);
        log::trace!("readback poll: queue empty = {}", polled.is_queue_empty());
        rx.recv()
            .map_err(|e| DeviceError::Backend(format!("readback: {e}")))?
            .map_err(|e| DeviceError::Backend(format!("readback: {e}")))?;

        let mut pixels = Vec::with_capacity(row as usize * height as usize);
        {
            let mapped = slice.get_mapped_range();
            for chunk in mapped.chunks(padded_row as usize) {
                pixels.extend_from_slice(&chunk[..row as usize]);
            }
        }
        staging.unmap();
        Ok(pixels)
    }

    fn allocate(&self, label: &str, data: &[u8]) -> Result<wgpu::Buffer, DeviceError> {
        let size = data.len() as u64;
        let reason = if size == 0 {
            Some("empty vertex data".to_string())
        } else if size % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            Some(format!("size is not a multiple of {}", wgpu::COPY_BUFFER_ALIGNMENT))
        } else if size > self.device.limits().max_buffer_size {
            Some(format!("exceeds max_buffer_size {}", self.device.limits().max_buffer_size))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(DeviceError::Allocation { label: label.to_string(), size, reason });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(DeviceError::Allocation {
                label: label.to_string(),
                size,
                reason: err.to_string(),
            });
        }
        self.queue.write_buffer(&buffer, 0, data);
        Ok(buffer)
    }

    /// Frame and bound material a draw with `layout` would use.
    fn draw_target(&mut self, layout: &VertexLayout) -> Result<(&mut FrameState, PipelineKey, Arc<wgpu::BindGroup>), DeviceError> {
        let frame = self.frame.as_mut().ok_or(DeviceError::NoActiveFrame)?;
        let bound = self.bound.as_ref().ok_or(DeviceError::NoMaterialBound)?;
        if bound.key.texture_layers != layout.texture_layers() {
            return Err(DeviceError::Backend(format!(
                "vertex layout has {} texture layers, bound material has {}",
                layout.texture_layers(),
                bound.key.texture_layers
            )));
        }
        Ok((frame, bound.key, Arc::clone(&bound.bind_group)))
    }
}

impl GraphicsDevice for WgpuDevice {
    fn max_texture_layers(&self) -> u32 {
        self.max_texture_layers
    }

    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> Result<BufferId, DeviceError> {
        let buffer = self.allocate(label, data)?;
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, Arc::new(buffer));
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), DeviceError> {
        let removed = self.buffers.remove(&buffer).ok_or(DeviceError::UnknownBuffer(buffer))?;
        removed.destroy();
        Ok(())
    }

    fn bind_material(&mut self, material: &Material) -> Result<(), DeviceError> {
        let layers = material.texture_layer_count();
        if layers > self.max_texture_layers as usize {
            return Err(DeviceError::Backend(format!(
                "{} uses {layers} texture layers, device supports {}",
                material.id, self.max_texture_layers
            )));
        }
        let key = PipelineKey {
            texture_layers: layers,
            translucent: material.is_translucent(),
        };
        self.pipelines.ensure(&self.device, key);

        let params = material_params(material);
        let views: Vec<Arc<wgpu::TextureView>> = material
            .texture_layers
            .iter()
            .map(|layer| match self.textures.get(&layer.texture) {
                Some(view) => Arc::clone(view),
                None => {
                    log::trace!("{:?} not uploaded, sampling white", layer.texture);
                    Arc::clone(&self.default_texture)
                }
            })
            .collect();
        if let Some(cached) = self.materials.get(&material.id) {
            if cached.matches(key, &params, &views) {
                self.bound = Some(cached.bound.clone());
                return Ok(());
            }
        }

        let params_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("primbuf_material_params"),
            size: material_uniform_size(layers),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&params_buf, 0, bytemuck::cast_slice(&params));

        let bind_group = {
            let mut entries = vec![
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ];
            entries.extend(views.iter().enumerate().map(|(layer, view)| wgpu::BindGroupEntry {
                binding: 2 + layer as u32,
                resource: wgpu::BindingResource::TextureView(view),
            }));
            let layout = self.pipelines.material_layout(&self.device, layers);
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("primbuf_material_bg"),
                layout,
                entries: &entries,
            });
            bind_group
        };
        self.material_bind_groups_created += 1;
        log::trace!("{} bind group built ({layers} layers)", material.id);
        let bound = BoundMaterial {
            key,
            bind_group: Arc::new(bind_group),
        };
        self.materials.insert(
            material.id,
            CachedMaterial {
                bound: bound.clone(),
                params,
                views,
            },
        );
        self.bound = Some(bound);
        Ok(())
    }

    fn draw_buffer(&mut self, buffer: BufferId, layout: &VertexLayout, vertex_count: u32) -> Result<(), DeviceError> {
        let vertices = self.buffers.get(&buffer).map(Arc::clone).ok_or(DeviceError::UnknownBuffer(buffer))?;
        let (frame, pipeline, material) = self.draw_target(layout)?;
        frame.draws.push(RecordedDraw { pipeline, material, vertices, vertex_count });
        Ok(())
    }

    fn draw_vertices(&mut self, layout: &VertexLayout, data: &[u8], vertex_count: u32) -> Result<(), DeviceError> {
        self.draw_target(layout)?;
        if vertex_count == 0 {
            return Ok(());
        }
        let vertices = Arc::new(self.allocate("primbuf_transient", data)?);
        let (frame, pipeline, material) = self.draw_target(layout)?;
        frame.transient_bytes += data.len() as u64;
        frame.draws.push(RecordedDraw { pipeline, material, vertices, vertex_count });
        Ok(())
    }
}

/// Material uniform contents: color, alpha cutoff, then one modulate flag per texture layer.
fn material_params(material: &Material) -> Vec<f32> {
    let layers = material.texture_layer_count();
    let cutoff = if material.transparency == Transparency::Binary { BINARY_ALPHA_CUTOFF } else { 0.0 };
    let mut params = Vec::with_capacity(material_uniform_size(layers) as usize / 4);
    params.extend_from_slice(&material.color);
    params.extend_from_slice(&[cutoff, 0.0, 0.0, 0.0]);
    for layer in &material.texture_layers {
        params.extend_from_slice(&[if layer.color_modulated { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0]);
    }
    params
}

fn create_rgba8_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::TextureView {
    let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture.create_view(&Default::default())
}
