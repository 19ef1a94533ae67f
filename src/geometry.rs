use crate::block_position::BlockPos;

/// Voxel line from `start` to `end`, both ends included (3-D Bresenham).
pub fn line_points(start: BlockPos, end: BlockPos) -> Vec<BlockPos> {
    let mut points = Vec::new();
    let dx = (end.x - start.x).abs();
    let dy = (end.y - start.y).abs();
    let dz = (end.z - start.z).abs();
    let sx = if start.x < end.x { 1 } else { -1 };
    let sy = if start.y < end.y { 1 } else { -1 };
    let sz = if start.z < end.z { 1 } else { -1 };

    let dm = dx.max(dy).max(dz);
    let mut p = start;

    let mut err_x = dm / 2;
    let mut err_y = dm / 2;
    let mut err_z = dm / 2;

    for _ in 0..=dm {
        points.push(p);
        err_x -= dx;
        err_y -= dy;
        err_z -= dz;
        if err_x < 0 {
            err_x += dm;
            p.x += sx;
        }
        if err_y < 0 {
            err_y += dm;
            p.y += sy;
        }
        if err_z < 0 {
            err_z += dm;
            p.z += sz;
        }
    }
    points
}

/// Cross product of two integer vectors.
pub(crate) fn cross(a: [i128; 3], b: [i128; 3]) -> [i128; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn dot(a: [i128; 3], b: [i128; 3]) -> i128 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn vec_of(p: BlockPos) -> [i128; 3] {
    [p.x as i128, p.y as i128, p.z as i128]
}

pub(crate) fn sub(a: [i128; 3], b: [i128; 3]) -> [i128; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endpoints() {
        let a = BlockPos::new(0, 0, 0);
        let b = BlockPos::new(5, 2, -3);
        let pts = line_points(a, b);
        assert_eq!(pts.first(), Some(&a));
        assert_eq!(pts.last(), Some(&b));
        assert_eq!(pts.len(), 6);
        for w in pts.windows(2) {
            assert!(w[0].distance_squared(&w[1]) <= 3);
        }
    }

    #[test]
    fn test_line_single_point() {
        let a = BlockPos::new(3, 3, 3);
        assert_eq!(line_points(a, a), vec![a]);
    }

    #[test]
    fn test_cross_dot() {
        let x = [1, 0, 0];
        let y = [0, 1, 0];
        assert_eq!(cross(x, y), [0, 0, 1]);
        assert_eq!(dot(x, y), 0);
    }
}
