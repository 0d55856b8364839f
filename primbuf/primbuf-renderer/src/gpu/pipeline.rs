//! Pipelines keyed by texture-layer count and blending mode. Each layer count gets its own WGSL
//! module and material bind group layout, generated on first use.

use std::collections::HashMap;

use primbuf_api::VertexLayout;

/// Bytes of the per-material uniform before the per-layer entries.
const MATERIAL_HEADER_SIZE: u64 = 32;
/// Bytes per texture-layer entry (one `vec4<f32>`, `x` = color-modulated flag).
const MATERIAL_LAYER_SIZE: u64 = 16;
/// First texture binding in group 1 (0 is the material uniform, 1 the sampler).
const FIRST_TEXTURE_BINDING: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub texture_layers: usize,
    pub translucent: bool,
}

/// Size of the material uniform for `texture_layers` layers.
pub fn material_uniform_size(texture_layers: usize) -> u64 {
    MATERIAL_HEADER_SIZE + MATERIAL_LAYER_SIZE * texture_layers as u64
}

/// Vertex attributes in interleave order: one `vec2` per layer, then normal, then position.
pub fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    let layers = layout.texture_layers();
    let mut attributes: Vec<wgpu::VertexAttribute> = (0..layers)
        .map(|layer| wgpu::VertexAttribute {
            offset: layout.tex_coord_offset(layer),
            shader_location: layer as u32,
            format: wgpu::VertexFormat::Float32x2,
        })
        .collect();
    attributes.push(wgpu::VertexAttribute {
        offset: layout.normal_offset(),
        shader_location: layers as u32,
        format: wgpu::VertexFormat::Float32x3,
    });
    attributes.push(wgpu::VertexAttribute {
        offset: layout.position_offset(),
        shader_location: layers as u32 + 1,
        format: wgpu::VertexFormat::Float32x3,
    });
    attributes
}

/// WGSL for a material with `layers` texture layers. Layers are applied in order; a
/// color-modulated layer multiplies the running color, any other layer replaces it.
pub fn shader_source(layers: usize) -> String {
    let mut src = String::from(
        "struct Globals {\n    view_proj: mat4x4<f32>,\n    light_dir: vec4<f32>,\n    light_color: vec4<f32>,\n};\n\n",
    );
    src.push_str("struct MaterialParams {\n    color: vec4<f32>,\n    misc: vec4<f32>,\n");
    if layers > 0 {
        src.push_str(&format!("    layer_modes: array<vec4<f32>, {layers}>,\n"));
    }
    src.push_str("};\n\n");
    src.push_str("@group(0) @binding(0) var<uniform> globals: Globals;\n");
    src.push_str("@group(1) @binding(0) var<uniform> material: MaterialParams;\n");
    if layers > 0 {
        src.push_str("@group(1) @binding(1) var layer_sampler: sampler;\n");
    }
    for layer in 0..layers {
        src.push_str(&format!(
            "@group(1) @binding({}) var layer_{layer}: texture_2d<f32>;\n",
            FIRST_TEXTURE_BINDING + layer as u32
        ));
    }

    src.push_str("\nstruct VsIn {\n");
    for layer in 0..layers {
        src.push_str(&format!("    @location({layer}) uv_{layer}: vec2<f32>,\n"));
    }
    src.push_str(&format!("    @location({}) normal: vec3<f32>,\n", layers));
    src.push_str(&format!("    @location({}) position: vec3<f32>,\n", layers + 1));
    src.push_str("};\n\nstruct VsOut {\n    @builtin(position) clip: vec4<f32>,\n    @location(0) normal: vec3<f32>,\n");
    for layer in 0..layers {
        src.push_str(&format!("    @location({}) uv_{layer}: vec2<f32>,\n", layer + 1));
    }
    src.push_str("};\n\n");

    src.push_str("@vertex\nfn vs(input: VsIn) -> VsOut {\n    var out: VsOut;\n");
    src.push_str("    out.clip = globals.view_proj * vec4<f32>(input.position, 1.0);\n");
    src.push_str("    out.normal = input.normal;\n");
    for layer in 0..layers {
        src.push_str(&format!("    out.uv_{layer} = input.uv_{layer};\n"));
    }
    src.push_str("    return out;\n}\n\n");

    src.push_str("@fragment\nfn fs(input: VsOut) -> @location(0) vec4<f32> {\n    var color = material.color;\n");
    for layer in 0..layers {
        src.push_str(&format!(
            "    let sample_{layer} = textureSample(layer_{layer}, layer_sampler, input.uv_{layer});\n"
        ));
        src.push_str(&format!(
            "    color = select(sample_{layer}, color * sample_{layer}, material.layer_modes[{layer}].x > 0.5);\n"
        ));
    }
    src.push_str("    if (color.a < material.misc.x) {\n        discard;\n    }\n");
    src.push_str("    let n = normalize(input.normal);\n");
    src.push_str("    let diffuse = max(dot(n, -normalize(globals.light_dir.xyz)), 0.0);\n");
    src.push_str("    let shade = 0.35 + 0.65 * diffuse;\n");
    src.push_str("    return vec4<f32>(color.rgb * shade * globals.light_color.rgb, color.a);\n}\n");
    src
}

pub struct PipelineCache {
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    globals_layout: wgpu::BindGroupLayout,
    material_layouts: HashMap<usize, wgpu::BindGroupLayout>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, depth_format: wgpu::TextureFormat) -> Self {
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("primbuf_globals_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(super::GLOBALS_SIZE),
                },
                count: None,
            }],
        });
        Self {
            color_format,
            depth_format,
            globals_layout,
            material_layouts: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    pub fn globals_layout(&self) -> &wgpu::BindGroupLayout {
        &self.globals_layout
    }

    /// Group 1 layout: material uniform, sampler, then one texture per layer.
    pub fn material_layout(&mut self, device: &wgpu::Device, texture_layers: usize) -> &wgpu::BindGroupLayout {
        self.material_layouts.entry(texture_layers).or_insert_with(|| {
            let mut entries = vec![
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(material_uniform_size(texture_layers)),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ];
            entries.extend((0..texture_layers).map(|layer| wgpu::BindGroupLayoutEntry {
                binding: FIRST_TEXTURE_BINDING + layer as u32,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }));
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("primbuf_material_bgl"),
                entries: &entries,
            })
        })
    }

    /// Create the pipeline for `key` if it does not exist yet.
    pub fn ensure(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        self.material_layout(device, key.texture_layers);
        let Some(material_layout) = self.material_layouts.get(&key.texture_layers) else {
            return;
        };
        let pipeline = create_pipeline(
            device,
            &self.globals_layout,
            material_layout,
            key,
            self.color_format,
            self.depth_format,
        );
        log::debug!(
            "created pipeline for {} texture layers (translucent: {})",
            key.texture_layers,
            key.translucent
        );
        self.pipelines.insert(key, pipeline);
    }

    pub fn get(&self, key: PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&key)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    globals_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
    key: PipelineKey,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("primbuf_shader"),
        source: wgpu::ShaderSource::Wgsl(shader_source(key.texture_layers).into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("primbuf_pipeline_layout"),
        bind_group_layouts: &[globals_layout, material_layout],
        push_constant_ranges: &[],
    });
    let vertex_layout = VertexLayout::for_texture_layers(key.texture_layers);
    let attributes = vertex_attributes(&vertex_layout);
    let (blend, depth_write_enabled) = if key.translucent {
        (Some(wgpu::BlendState::ALPHA_BLENDING), false)
    } else {
        (Some(wgpu::BlendState::REPLACE), true)
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(if key.translucent {
            "primbuf_translucent_pipeline"
        } else {
            "primbuf_opaque_pipeline"
        }),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: vertex_layout.stride(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        // Packed geometry has mixed winding after the z flip.
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
