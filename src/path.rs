use crate::types::PxPoint;

/// Receiver for drawing commands in 26.6 coordinates. The path compiler
/// emits through this trait; a scanner implements it on the consuming side.
pub trait Emitter {
    fn start(&mut self, p: PxPoint);
    fn line(&mut self, b: PxPoint);
    fn quad_bezier(&mut self, b: PxPoint, c: PxPoint);
    fn cube_bezier(&mut self, b: PxPoint, c: PxPoint, d: PxPoint);
    /// Ends the current subpath; `closed` joins it back to its start point.
    fn stop(&mut self, closed: bool);
    /// Drops all accumulated state. Called between paths.
    fn clear(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCommand {
    Start(PxPoint),
    Line(PxPoint),
    QuadBezier(PxPoint, PxPoint),
    CubeBezier(PxPoint, PxPoint, PxPoint),
    Stop(bool),
}

/// A recorded command stream. Compiling a path writes into one of these;
/// rendering replays it into another emitter, usually through a matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    commands: Vec<PathCommand>,
}

impl Path {
    pub fn new() -> Path {
        Path::default()
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Replays the recorded commands into another emitter, in order.
    pub fn add_to<E: Emitter + ?Sized>(&self, out: &mut E) {
        for cmd in &self.commands {
            match *cmd {
                PathCommand::Start(a) => out.start(a),
                PathCommand::Line(b) => out.line(b),
                PathCommand::QuadBezier(b, c) => out.quad_bezier(b, c),
                PathCommand::CubeBezier(b, c, d) => out.cube_bezier(b, c, d),
                PathCommand::Stop(closed) => out.stop(closed),
            }
        }
    }
}

impl Emitter for Path {
    fn start(&mut self, p: PxPoint) {
        self.commands.push(PathCommand::Start(p));
    }

    fn line(&mut self, b: PxPoint) {
        self.commands.push(PathCommand::Line(b));
    }

    fn quad_bezier(&mut self, b: PxPoint, c: PxPoint) {
        self.commands.push(PathCommand::QuadBezier(b, c));
    }

    fn cube_bezier(&mut self, b: PxPoint, c: PxPoint, d: PxPoint) {
        self.commands.push(PathCommand::CubeBezier(b, c, d));
    }

    fn stop(&mut self, closed: bool) {
        self.commands.push(PathCommand::Stop(closed));
    }

    fn clear(&mut self) {
        self.commands.clear();
    }
}
