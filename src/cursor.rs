use crate::error::KeylineError;
use crate::numbers::push_floats;
use crate::path::{Emitter, Path};
use crate::types::{Px, PxPoint};
use tracing::warn;

/// What to do with path command letters the compiler does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    #[default]
    Ignore,
    Warn,
    Strict,
}

/// Compiles SVG `d` attribute text into a recorded command stream.
///
/// State carried between commands: the pen position, the last implicit
/// control point (for `S`/`T` reflection), the subpath start, and the last
/// command letter. Floats stay in the cursor; coordinates cross into 26.6
/// only at emission.
#[derive(Debug)]
pub struct PathCursor {
    pub path: Path,
    pub error_mode: ErrorMode,
    pub(crate) place_x: f64,
    pub(crate) place_y: f64,
    cntl_x: f64,
    cntl_y: f64,
    start_x: Px,
    start_y: Px,
    points: Vec<f64>,
    last_key: char,
    in_path: bool,
}

impl Default for PathCursor {
    fn default() -> Self {
        PathCursor {
            path: Path::new(),
            error_mode: ErrorMode::Ignore,
            place_x: 0.0,
            place_y: 0.0,
            cntl_x: 0.0,
            cntl_y: 0.0,
            start_x: Px::ZERO,
            start_y: Px::ZERO,
            points: Vec::new(),
            last_key: ' ',
            in_path: false,
        }
    }
}

fn reflect(px: f64, py: f64, rx: f64, ry: f64) -> (f64, f64) {
    (px * 2.0 - rx, py * 2.0 - ry)
}

impl PathCursor {
    pub fn new() -> PathCursor {
        PathCursor::default()
    }

    fn init(&mut self) {
        self.place_x = 0.0;
        self.place_y = 0.0;
        self.points.clear();
        self.last_key = ' ';
        self.path.clear();
        self.in_path = false;
    }

    /// Runs the accumulated parameter buffer through a cumulative sum,
    /// turning relative one-axis values (`h`/`v`) into absolute ones.
    fn vals_to_abs(&mut self, mut last: f64) {
        for p in self.points.iter_mut() {
            last += *p;
            *p = last;
        }
    }

    /// Converts relative coordinate pairs to absolute, re-anchoring each
    /// parameter set at the endpoint of the previous set.
    fn points_to_abs(&mut self, sz: usize) {
        let mut last_x = self.place_x;
        let mut last_y = self.place_y;
        let mut j = 0;
        while j + sz <= self.points.len() {
            let mut i = 0;
            while i + 1 < sz {
                self.points[i + j] += last_x;
                self.points[i + 1 + j] += last_y;
                i += 2;
            }
            last_x = self.points[j + sz - 2];
            last_y = self.points[j + sz - 1];
            j += sz;
        }
    }

    /// Checks the parameter buffer holds one or more complete sets of `sz`
    /// values, converting to absolute first when the command was relative.
    fn has_sets_or_more(&mut self, sz: usize, rel: bool) -> bool {
        if !(self.points.len() >= sz && self.points.len() % sz == 0) {
            return false;
        }
        if rel {
            self.points_to_abs(sz);
        }
        true
    }

    /// Decodes one command segment (a command letter plus its parameters).
    fn add_seg(&mut self, seg: &str) -> Result<(), KeylineError> {
        let k = match seg.chars().next() {
            Some(c) => c,
            None => return Ok(()),
        };
        self.points.clear();
        push_floats(&mut self.points, &seg[k.len_utf8()..])?;
        let l = self.points.len();

        match k {
            'Z' | 'z' => {
                if l != 0 {
                    return Err(KeylineError::ParamMismatch);
                }
                if self.in_path {
                    self.path.stop(true);
                    self.in_path = false;
                }
            }
            'M' | 'm' => {
                let rel = k == 'm';
                if rel {
                    // A relative moveto anchors at the origin, so the lead
                    // pair lands absolute and later pairs accumulate.
                    self.place_x = 0.0;
                    self.place_y = 0.0;
                }
                if !self.has_sets_or_more(2, rel) {
                    return Err(KeylineError::ParamMismatch);
                }
                self.start_x = Px::from_f64(self.points[0]);
                self.start_y = Px::from_f64(self.points[1]);
                self.in_path = true;
                self.path.start(PxPoint::new(self.start_x, self.start_y));
                // Pairs after the first are implicit linetos.
                let mut i = 2;
                while i + 1 < l {
                    self.path
                        .line(PxPoint::from_f64(self.points[i], self.points[i + 1]));
                    i += 2;
                }
                self.place_x = self.points[l - 2];
                self.place_y = self.points[l - 1];
            }
            'L' | 'l' => {
                if !self.has_sets_or_more(2, k == 'l') {
                    return Err(KeylineError::ParamMismatch);
                }
                let mut i = 0;
                while i + 1 < l {
                    self.path
                        .line(PxPoint::from_f64(self.points[i], self.points[i + 1]));
                    i += 2;
                }
                self.place_x = self.points[l - 2];
                self.place_y = self.points[l - 1];
            }
            'V' | 'v' => {
                if k == 'v' {
                    let base = self.place_y;
                    self.vals_to_abs(base);
                }
                if !self.has_sets_or_more(1, false) {
                    return Err(KeylineError::ParamMismatch);
                }
                for i in 0..l {
                    self.path
                        .line(PxPoint::from_f64(self.place_x, self.points[i]));
                }
                self.place_y = self.points[l - 1];
            }
            'H' | 'h' => {
                if k == 'h' {
                    let base = self.place_x;
                    self.vals_to_abs(base);
                }
                if !self.has_sets_or_more(1, false) {
                    return Err(KeylineError::ParamMismatch);
                }
                for i in 0..l {
                    self.path
                        .line(PxPoint::from_f64(self.points[i], self.place_y));
                }
                self.place_x = self.points[l - 1];
            }
            'Q' | 'q' => {
                if !self.has_sets_or_more(4, k == 'q') {
                    return Err(KeylineError::ParamMismatch);
                }
                let mut i = 0;
                while i + 3 < l {
                    self.path.quad_bezier(
                        PxPoint::from_f64(self.points[i], self.points[i + 1]),
                        PxPoint::from_f64(self.points[i + 2], self.points[i + 3]),
                    );
                    i += 4;
                }
                self.cntl_x = self.points[l - 4];
                self.cntl_y = self.points[l - 3];
                self.place_x = self.points[l - 2];
                self.place_y = self.points[l - 1];
            }
            'T' | 't' => {
                if !self.has_sets_or_more(2, k == 't') {
                    return Err(KeylineError::ParamMismatch);
                }
                let mut i = 0;
                while i + 1 < l {
                    // Reflection only fires off a preceding quadratic;
                    // otherwise the control point collapses onto the pen.
                    match self.last_key {
                        'q' | 'Q' | 'T' | 't' => {
                            let (x, y) =
                                reflect(self.place_x, self.place_y, self.cntl_x, self.cntl_y);
                            self.cntl_x = x;
                            self.cntl_y = y;
                        }
                        _ => {
                            self.cntl_x = self.place_x;
                            self.cntl_y = self.place_y;
                        }
                    }
                    self.path.quad_bezier(
                        PxPoint::from_f64(self.cntl_x, self.cntl_y),
                        PxPoint::from_f64(self.points[i], self.points[i + 1]),
                    );
                    self.last_key = k;
                    self.place_x = self.points[i];
                    self.place_y = self.points[i + 1];
                    i += 2;
                }
            }
            'C' | 'c' => {
                if !self.has_sets_or_more(6, k == 'c') {
                    return Err(KeylineError::ParamMismatch);
                }
                let mut i = 0;
                while i + 5 < l {
                    self.path.cube_bezier(
                        PxPoint::from_f64(self.points[i], self.points[i + 1]),
                        PxPoint::from_f64(self.points[i + 2], self.points[i + 3]),
                        PxPoint::from_f64(self.points[i + 4], self.points[i + 5]),
                    );
                    i += 6;
                }
                self.cntl_x = self.points[l - 4];
                self.cntl_y = self.points[l - 3];
                self.place_x = self.points[l - 2];
                self.place_y = self.points[l - 1];
            }
            'S' | 's' => {
                if !self.has_sets_or_more(4, k == 's') {
                    return Err(KeylineError::ParamMismatch);
                }
                let mut i = 0;
                while i + 3 < l {
                    match self.last_key {
                        'c' | 'C' | 's' | 'S' => {
                            let (x, y) =
                                reflect(self.place_x, self.place_y, self.cntl_x, self.cntl_y);
                            self.cntl_x = x;
                            self.cntl_y = y;
                        }
                        _ => {
                            self.cntl_x = self.place_x;
                            self.cntl_y = self.place_y;
                        }
                    }
                    self.path.cube_bezier(
                        PxPoint::from_f64(self.cntl_x, self.cntl_y),
                        PxPoint::from_f64(self.points[i], self.points[i + 1]),
                        PxPoint::from_f64(self.points[i + 2], self.points[i + 3]),
                    );
                    self.last_key = k;
                    self.cntl_x = self.points[i];
                    self.cntl_y = self.points[i + 1];
                    self.place_x = self.points[i + 2];
                    self.place_y = self.points[i + 3];
                    i += 4;
                }
            }
            'A' | 'a' => {
                if !self.has_sets_or_more(7, false) {
                    return Err(KeylineError::ParamMismatch);
                }
                let mut i = 0;
                while i + 6 < l {
                    let mut pts = [
                        self.points[i],
                        self.points[i + 1],
                        self.points[i + 2],
                        self.points[i + 3],
                        self.points[i + 4],
                        self.points[i + 5],
                        self.points[i + 6],
                    ];
                    if k == 'a' {
                        // Only the endpoint is relative; radii, rotation and
                        // flags are the same either way.
                        pts[5] += self.place_x;
                        pts[6] += self.place_y;
                    }
                    self.add_arc(&mut pts);
                    i += 7;
                }
            }
            _ => match self.error_mode {
                ErrorMode::Strict => return Err(KeylineError::UnknownCommand(k)),
                ErrorMode::Warn => warn!(command = %k, "ignoring svg path command"),
                ErrorMode::Ignore => {}
            },
        }
        // Remembered so the next segment knows how to extend this one.
        self.last_key = k;
        Ok(())
    }

    /// Compiles the path description into this cursor's command stream.
    /// The whole path is abandoned on the first error; nothing partial is
    /// handed downstream.
    pub fn compile(&mut self, svg_path: &str) -> Result<(), KeylineError> {
        self.init();
        let mut seg_start: Option<usize> = None;
        for (i, v) in svg_path.char_indices() {
            // Letters delimit command segments; 'e' belongs to exponents.
            if v.is_alphabetic() && v != 'e' {
                if let Some(start) = seg_start {
                    self.add_seg(&svg_path[start..i])?;
                }
                seg_start = Some(i);
            }
        }
        if let Some(start) = seg_start {
            self.add_seg(&svg_path[start..])?;
        }
        Ok(())
    }
}
