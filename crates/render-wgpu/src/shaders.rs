/// WGSL shader for textured quads in pixel space: chunk bakes and screen
/// blits. The uniform carries the target size; Y points down.
pub const QUAD_SHADER: &str = r#"
struct TargetInfo {
    size: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> target_info: TargetInfo;
@group(0) @binding(1)
var atlas_texture: texture_2d<f32>;
@group(0) @binding(2)
var atlas_sampler: sampler;

struct QuadVertex {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

struct QuadOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_quad(vertex: QuadVertex) -> QuadOutput {
    var out: QuadOutput;
    let ndc = vec2<f32>(
        vertex.position.x / target_info.size.x * 2.0 - 1.0,
        1.0 - vertex.position.y / target_info.size.y * 2.0,
    );
    out.clip_position = vec4<f32>(ndc, 0.0, 1.0);
    out.uv = vertex.uv;
    return out;
}

@fragment
fn fs_quad(in: QuadOutput) -> @location(0) vec4<f32> {
    return textureSample(atlas_texture, atlas_sampler, in.uv);
}
"#;

/// WGSL shader for instanced sprites. A unit-quad template is stretched to
/// each instance's destination rect; a zero-area UV marks a shadow
/// instance, rendered as a procedural soft ellipse with the last instance
/// float as opacity.
pub const SPRITE_SHADER: &str = r#"
struct TargetInfo {
    size: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> target_info: TargetInfo;
@group(0) @binding(1)
var atlas_texture: texture_2d<f32>;
@group(0) @binding(2)
var atlas_sampler: sampler;

struct TemplateVertex {
    @location(0) corner: vec2<f32>,
};

struct SpriteInstance {
    @location(1) dest: vec4<f32>,
    @location(2) uv: vec4<f32>,
    @location(3) misc: vec2<f32>,
};

struct SpriteOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) local: vec2<f32>,
    @location(2) params: vec2<f32>,
};

@vertex
fn vs_sprite(vertex: TemplateVertex, instance: SpriteInstance) -> SpriteOutput {
    var out: SpriteOutput;
    let pixel = instance.dest.xy + vertex.corner * instance.dest.zw;
    let ndc = vec2<f32>(
        pixel.x / target_info.size.x * 2.0 - 1.0,
        1.0 - pixel.y / target_info.size.y * 2.0,
    );
    out.clip_position = vec4<f32>(ndc, 0.0, 1.0);

    var u = mix(instance.uv.x, instance.uv.z, vertex.corner.x);
    if (instance.misc.x > 0.5) {
        u = mix(instance.uv.z, instance.uv.x, vertex.corner.x);
    }
    let v = mix(instance.uv.y, instance.uv.w, vertex.corner.y);
    out.uv = vec2<f32>(u, v);
    out.local = vertex.corner;

    let shadow = select(0.0, 1.0, instance.uv.x == instance.uv.z && instance.uv.y == instance.uv.w);
    out.params = vec2<f32>(shadow, instance.misc.y);
    return out;
}

@fragment
fn fs_sprite(in: SpriteOutput) -> @location(0) vec4<f32> {
    if (in.params.x > 0.5) {
        // Shadow: soft-edged ellipse filling the instance rect.
        let d = length((in.local - vec2<f32>(0.5, 0.5)) * 2.0);
        let alpha = smoothstep(1.0, 0.55, d) * in.params.y;
        return vec4<f32>(0.0, 0.0, 0.0, alpha);
    }
    let color = textureSample(atlas_texture, atlas_sampler, in.uv);
    return vec4<f32>(color.rgb, color.a * in.params.y);
}
"#;

/// WGSL shader downsampling one mip level into the next via a fullscreen
/// triangle.
pub const MIP_SHADER: &str = r#"
@group(0) @binding(0)
var src_texture: texture_2d<f32>;
@group(0) @binding(1)
var src_sampler: sampler;

struct MipOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_mip(@builtin(vertex_index) index: u32) -> MipOutput {
    var out: MipOutput;
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    out.clip_position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_mip(in: MipOutput) -> @location(0) vec4<f32> {
    return textureSample(src_texture, src_sampler, in.uv);
}
"#;
