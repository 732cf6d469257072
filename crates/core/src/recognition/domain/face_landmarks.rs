//! 5-point face landmarks used to center the recognition crop.
//!
//! Weights emphasize nose (3x) over eyes (2x) and mouth (1x), since nose
//! position is the most reliable anchor across head rotations.

/// Landmark weights: [left_eye, right_eye, nose, left_mouth, right_mouth].
const WEIGHTS: [f64; 5] = [2.0, 2.0, 3.0, 1.0, 1.0];

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    /// Points with x <= 0 are treated as invisible.
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); 5] {
        &self.points
    }

    pub fn has_visible(&self) -> bool {
        self.points.iter().any(|(x, _)| *x > 0.0)
    }

    /// Weighted centroid of visible landmarks, `None` when none are visible.
    pub fn center(&self) -> Option<(f64, f64)> {
        let mut wx_sum = 0.0;
        let mut wy_sum = 0.0;
        let mut w_sum = 0.0;

        for (i, (x, y)) in self.points.iter().enumerate() {
            if *x > 0.0 {
                wx_sum += x * WEIGHTS[i];
                wy_sum += y * WEIGHTS[i];
                w_sum += WEIGHTS[i];
            }
        }

        if w_sum == 0.0 {
            None
        } else {
            Some((wx_sum / w_sum, wy_sum / w_sum))
        }
    }

    /// Scales visible points per axis; invisible points stay invisible.
    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        let mut points = self.points;
        for p in points.iter_mut() {
            if p.0 > 0.0 {
                *p = (p.0 * sx, p.1 * sy);
            }
        }
        Self { points }
    }
}
