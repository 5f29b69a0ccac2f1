pub mod names;

use crate::graphics::{Graphics, GraphicsError, Program, Shader, ShaderStage, UniformLocation};
use snafu::{ResultExt, Snafu, ensure};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, trace};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum ShaderError {
    #[snafu(display("Failed to compile the {stage} stage of shader {name:?}: {log}"))]
    Compile {
        name: String,
        stage: ShaderStage,
        log: String,
    },

    #[snafu(display("Failed to link shader {name:?}: {log}"))]
    Link { name: String, log: String },

    #[snafu(display("Couldn't read shader source {}: {source}", path.display()))]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(transparent)]
    Graphics { source: GraphicsError },
}

/// Shared shader cache, keyed by shader name.
pub type ShaderMap = HashMap<String, Rc<ShaderProgram>>;

/// A linked program plus cached name lookups.
///
/// Lookups that fail are cached too, so a shader that doesn't declare a
/// well-known uniform costs one driver query per name, not one per draw.
#[derive(Debug)]
pub struct ShaderProgram {
    name: String,
    program: Program,
    uniforms: RefCell<HashMap<String, Option<UniformLocation>>>,
    attributes: RefCell<HashMap<String, Option<u32>>>,
}

impl ShaderProgram {
    pub fn from_sources(
        gfx: &Graphics,
        name: impl Into<String>,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self, ShaderError> {
        Self::link(
            gfx,
            name.into(),
            &[(ShaderStage::Vertex, vertex), (ShaderStage::Fragment, fragment)],
        )
    }

    pub fn from_sources_with_geometry(
        gfx: &Graphics,
        name: impl Into<String>,
        vertex: &str,
        geometry: &str,
        fragment: &str,
    ) -> Result<Self, ShaderError> {
        Self::link(
            gfx,
            name.into(),
            &[
                (ShaderStage::Vertex, vertex),
                (ShaderStage::Geometry, geometry),
                (ShaderStage::Fragment, fragment),
            ],
        )
    }

    /// Reads both stages from disk, then compiles and links them.
    pub fn load(
        gfx: &Graphics,
        name: impl Into<String>,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let vertex = read_source(vertex_path.as_ref())?;
        let fragment = read_source(fragment_path.as_ref())?;
        Self::from_sources(gfx, name, &vertex, &fragment)
    }

    fn link(
        gfx: &Graphics,
        name: String,
        stages: &[(ShaderStage, &str)],
    ) -> Result<Self, ShaderError> {
        let mut shaders: Vec<Shader> = Vec::with_capacity(stages.len());

        let result = (|| -> Result<Program, ShaderError> {
            for (stage, source) in stages {
                let shader = gfx.create_shader(*stage)?;
                shaders.push(shader);
                compile(gfx, &name, *stage, shader, source)?;
            }

            let program = gfx.create_program()?;
            for shader in &shaders {
                gfx.attach_shader(program, *shader);
            }
            gfx.link_program(program);

            if !gfx.program_link_status(program) {
                let log = gfx.program_info_log(program);
                gfx.delete_program(program);
                return LinkErr { name: &name, log }.fail();
            }

            Ok(program)
        })();

        // stages are no longer needed once linked (or once anything failed)
        for shader in shaders {
            gfx.delete_shader(shader);
        }

        let program = result?;
        debug!("Linked shader {name:?} as program #{}", program.id());

        Ok(Self {
            name,
            program,
            uniforms: RefCell::default(),
            attributes: RefCell::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> Program {
        self.program
    }

    pub fn uniform_location(&self, gfx: &Graphics, name: &str) -> Option<UniformLocation> {
        if let Some(location) = self.uniforms.borrow().get(name) {
            return *location;
        }

        let location = gfx.get_uniform_location(self.program, name);
        if location.is_none() {
            trace!("Shader {:?} has no uniform {name}", self.name);
        }
        self.uniforms.borrow_mut().insert(name.to_string(), location);
        location
    }

    pub fn attrib_location(&self, gfx: &Graphics, name: &str) -> Option<u32> {
        if let Some(location) = self.attributes.borrow().get(name) {
            return *location;
        }

        let location = gfx.get_attrib_location(self.program, name);
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), location);
        location
    }

    pub fn destroy(self, gfx: &Graphics) {
        gfx.delete_program(self.program);
    }
}

fn compile(
    gfx: &Graphics,
    name: &str,
    stage: ShaderStage,
    shader: Shader,
    source: &str,
) -> Result<(), ShaderError> {
    gfx.shader_source(shader, source);
    gfx.compile_shader(shader);

    ensure!(
        gfx.shader_compile_status(shader),
        CompileErr {
            name,
            stage,
            log: gfx.shader_info_log(shader),
        }
    );
    Ok(())
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).context(ReadSourceErr { path })
}
