//! Built-in force backend.
//!
//! Link springs, many-body repulsion, centering and collision, accumulated
//! into node velocities and integrated once per step. All pairwise forces are
//! computed directly; wiki graphs are small enough that an approximation tree
//! buys nothing.

use super::sizing::node_radius;
use super::{LayoutParams, PhysicsStepper};
use crate::models::{GraphNode, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pairs closer than this are treated as this far apart by the charge force.
const MIN_CHARGE_DISTANCE2: f64 = 1.0;

pub struct ForceStepper {
    params: LayoutParams,
    center: Vec2,
    rng: StdRng,
}

impl ForceStepper {
    pub fn new(params: LayoutParams, center: Vec2) -> Self {
        Self::with_rng(params, center, StdRng::from_entropy())
    }

    pub fn with_rng(params: LayoutParams, center: Vec2, rng: StdRng) -> Self {
        Self {
            params,
            center,
            rng,
        }
    }

    /// A tiny random offset used to separate coincident points.
    fn jiggle(&mut self) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * 1e-6
    }

    fn apply_links(&mut self, nodes: &mut [GraphNode], edges: &[(usize, usize)], alpha: f64) {
        let mut degree = vec![0usize; nodes.len()];
        for &(s, t) in edges {
            degree[s] += 1;
            degree[t] += 1;
        }

        for &(s, t) in edges {
            if s == t {
                continue;
            }
            let (ds, dt) = (degree[s] as f64, degree[t] as f64);
            let strength = 1.0 / ds.min(dt);
            let bias = ds / (ds + dt);

            let (src, tgt) = (&nodes[s], &nodes[t]);
            let mut x = tgt.position.x + tgt.velocity.x - src.position.x - src.velocity.x;
            let mut y = tgt.position.y + tgt.velocity.y - src.position.y - src.velocity.y;
            if x == 0.0 {
                x = self.jiggle();
            }
            if y == 0.0 {
                y = self.jiggle();
            }
            let len = (x * x + y * y).sqrt();
            let k = (len - self.params.link_distance) / len * alpha * strength;
            let (fx, fy) = (x * k, y * k);

            nodes[t].velocity.x -= fx * bias;
            nodes[t].velocity.y -= fy * bias;
            nodes[s].velocity.x += fx * (1.0 - bias);
            nodes[s].velocity.y += fy * (1.0 - bias);
        }
    }

    fn apply_charge(&mut self, nodes: &mut [GraphNode], alpha: f64) {
        let positions: Vec<Vec2> = nodes.iter().map(|n| n.position).collect();
        for (i, node) in nodes.iter_mut().enumerate() {
            for (j, other) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mut x = other.x - positions[i].x;
                let mut y = other.y - positions[i].y;
                if x == 0.0 {
                    x = self.jiggle();
                }
                if y == 0.0 {
                    y = self.jiggle();
                }
                let mut l = x * x + y * y;
                if l < MIN_CHARGE_DISTANCE2 {
                    l = (MIN_CHARGE_DISTANCE2 * l).sqrt();
                }
                let w = self.params.charge_strength * alpha / l;
                node.velocity.x += x * w;
                node.velocity.y += y * w;
            }
        }
    }

    fn apply_center(&self, nodes: &mut [GraphNode]) {
        if nodes.is_empty() {
            return;
        }
        let n = nodes.len() as f64;
        let (sx, sy) = nodes
            .iter()
            .fold((0.0, 0.0), |(sx, sy), node| (sx + node.position.x, sy + node.position.y));
        let dx = (sx / n - self.center.x) * self.params.center_strength;
        let dy = (sy / n - self.center.y) * self.params.center_strength;
        for node in nodes.iter_mut() {
            node.position.x -= dx;
            node.position.y -= dy;
        }
    }

    fn apply_collision(&mut self, nodes: &mut [GraphNode]) {
        let strength = self.params.collision_strength;
        for i in 0..nodes.len() {
            let ri = node_radius(nodes[i].out_degree);
            let xi = nodes[i].position.x + nodes[i].velocity.x;
            let yi = nodes[i].position.y + nodes[i].velocity.y;
            for j in (i + 1)..nodes.len() {
                let rj = node_radius(nodes[j].out_degree);
                let r = ri + rj;
                let mut x = xi - nodes[j].position.x - nodes[j].velocity.x;
                let mut y = yi - nodes[j].position.y - nodes[j].velocity.y;
                let mut l = x * x + y * y;
                if l >= r * r {
                    continue;
                }
                if x == 0.0 {
                    x = self.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = self.jiggle();
                    l += y * y;
                }
                let len = l.sqrt();
                let k = (r - len) / len * strength;
                let (fx, fy) = (x * k, y * k);
                let (ri2, rj2) = (ri * ri, rj * rj);
                let share = rj2 / (ri2 + rj2);

                nodes[i].velocity.x += fx * share;
                nodes[i].velocity.y += fy * share;
                nodes[j].velocity.x -= fx * (1.0 - share);
                nodes[j].velocity.y -= fy * (1.0 - share);
            }
        }
    }

    /// Collision (when enabled) and centering applied straight to positions,
    /// for backends that integrate their own forces.
    pub(super) fn constrain(&mut self, nodes: &mut [GraphNode]) {
        if self.params.collision {
            for node in nodes.iter_mut() {
                node.velocity = Vec2::ZERO;
            }
            self.apply_collision(nodes);
            for node in nodes.iter_mut() {
                if node.pinned.is_none() {
                    node.position.x += node.velocity.x;
                    node.position.y += node.velocity.y;
                }
                node.velocity = Vec2::ZERO;
            }
        }
        self.apply_center(nodes);
        for node in nodes.iter_mut() {
            if let Some(pin) = node.pinned {
                node.position = pin;
            }
        }
    }

    fn integrate(&self, nodes: &mut [GraphNode]) {
        let keep = 1.0 - self.params.velocity_decay;
        for node in nodes.iter_mut() {
            match node.pinned {
                Some(pin) => {
                    node.position = pin;
                    node.velocity = Vec2::ZERO;
                }
                None => {
                    node.velocity.x *= keep;
                    node.velocity.y *= keep;
                    node.position.x += node.velocity.x;
                    node.position.y += node.velocity.y;
                }
            }
        }
    }
}

impl PhysicsStepper for ForceStepper {
    fn step(&mut self, nodes: &mut [GraphNode], edges: &[(usize, usize)], alpha: f64) {
        self.apply_links(nodes, edges, alpha);
        self.apply_charge(nodes, alpha);
        self.apply_center(nodes);
        if self.params.collision {
            self.apply_collision(nodes);
        }
        self.integrate(nodes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stepper(params: LayoutParams) -> ForceStepper {
        ForceStepper::with_rng(params, Vec2::new(0.0, 0.0), StdRng::seed_from_u64(3))
    }

    fn pair(distance: f64) -> Vec<GraphNode> {
        vec![
            GraphNode::new("a", "A", Vec2::new(-distance / 2.0, 0.0)),
            GraphNode::new("b", "B", Vec2::new(distance / 2.0, 0.0)),
        ]
    }

    #[test]
    fn test_charge_pushes_apart() {
        let params = LayoutParams {
            collision: false,
            ..LayoutParams::full()
        };
        let mut nodes = pair(10.0);
        stepper(params).step(&mut nodes, &[], 1.0);
        assert!(nodes[0].position.distance(nodes[1].position) > 10.0);
    }

    #[test]
    fn test_link_pulls_distant_pair_together() {
        let params = LayoutParams {
            charge_strength: 0.0,
            collision: false,
            ..LayoutParams::full()
        };
        let mut nodes = pair(600.0);
        stepper(params).step(&mut nodes, &[(0, 1)], 1.0);
        assert!(nodes[0].position.distance(nodes[1].position) < 600.0);
    }

    #[test]
    fn test_center_keeps_mean_on_center() {
        let params = LayoutParams::full();
        let mut nodes = vec![
            GraphNode::new("a", "A", Vec2::new(500.0, 500.0)),
            GraphNode::new("b", "B", Vec2::new(700.0, 500.0)),
        ];
        let mut s = stepper(params);
        s.apply_center(&mut nodes);
        let mx = (nodes[0].position.x + nodes[1].position.x) / 2.0;
        let my = (nodes[0].position.y + nodes[1].position.y) / 2.0;
        assert!(mx.abs() < 1e-9 && my.abs() < 1e-9);
    }

    #[test]
    fn test_collision_separates_overlap() {
        let params = LayoutParams {
            charge_strength: 0.0,
            ..LayoutParams::full()
        };
        let mut nodes = pair(4.0);
        let mut s = stepper(params);
        for _ in 0..20 {
            s.step(&mut nodes, &[], 0.0);
        }
        let d = nodes[0].position.distance(nodes[1].position);
        assert!(d > 4.0);
    }

    #[test]
    fn test_pinned_node_stays_put() {
        let mut nodes = pair(10.0);
        nodes[0].pinned = Some(Vec2::new(-5.0, 0.0));
        let mut s = stepper(LayoutParams::full());
        for _ in 0..10 {
            s.step(&mut nodes, &[(0, 1)], 1.0);
        }
        assert_eq!(nodes[0].position, Vec2::new(-5.0, 0.0));
        assert_eq!(nodes[0].velocity, Vec2::ZERO);
    }

    #[test]
    fn test_self_loop_is_ignored() {
        let params = LayoutParams {
            charge_strength: 0.0,
            collision: false,
            center_strength: 0.0,
            ..LayoutParams::full()
        };
        let mut nodes = vec![GraphNode::new("a", "A", Vec2::new(1.0, 2.0))];
        stepper(params).step(&mut nodes, &[(0, 0)], 1.0);
        assert_eq!(nodes[0].position, Vec2::new(1.0, 2.0));
    }
}
