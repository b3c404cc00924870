use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    Envelope,
}

impl GeometryType {
    pub fn name(&self) -> &'static str {
        match self {
            GeometryType::Point => "POINT",
            GeometryType::LineString => "LINESTRING",
            GeometryType::Polygon => "POLYGON",
            GeometryType::MultiPoint => "MULTIPOINT",
            GeometryType::MultiLineString => "MULTILINESTRING",
            GeometryType::MultiPolygon => "MULTIPOLYGON",
            GeometryType::GeometryCollection => "GEOMETRYCOLLECTION",
            GeometryType::Envelope => "ENVELOPE",
        }
    }

    pub fn from_name(name: &str) -> Option<GeometryType> {
        let kind = match name.to_ascii_uppercase().as_str() {
            "POINT" => GeometryType::Point,
            "LINESTRING" => GeometryType::LineString,
            "POLYGON" => GeometryType::Polygon,
            "MULTIPOINT" => GeometryType::MultiPoint,
            "MULTILINESTRING" => GeometryType::MultiLineString,
            "MULTIPOLYGON" => GeometryType::MultiPolygon,
            "GEOMETRYCOLLECTION" => GeometryType::GeometryCollection,
            "ENVELOPE" => GeometryType::Envelope,
            _ => return None,
        };

        Some(kind)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Coordinate {
        Coordinate { x, y, z: None }
    }

    fn distance(&self, other: &Coordinate) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Envelope {
        Envelope { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    fn expand(&mut self, other: &Envelope) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }
}

/// A polygon is a list of rings, the first one being the shell.
pub type Ring = Vec<Coordinate>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Geometry {
    Point(Option<Coordinate>),
    LineString(Vec<Coordinate>),
    Polygon(Vec<Ring>),
    MultiPoint(Vec<Coordinate>),
    MultiLineString(Vec<Vec<Coordinate>>),
    MultiPolygon(Vec<Vec<Ring>>),
    GeometryCollection(Vec<Geometry>),
    Envelope(Envelope),
}

impl Geometry {
    pub fn empty(kind: GeometryType) -> Option<Geometry> {
        let geometry = match kind {
            GeometryType::Point => Geometry::Point(None),
            GeometryType::LineString => Geometry::LineString(vec![]),
            GeometryType::Polygon => Geometry::Polygon(vec![]),
            GeometryType::MultiPoint => Geometry::MultiPoint(vec![]),
            GeometryType::MultiLineString => Geometry::MultiLineString(vec![]),
            GeometryType::MultiPolygon => Geometry::MultiPolygon(vec![]),
            GeometryType::GeometryCollection => Geometry::GeometryCollection(vec![]),
            GeometryType::Envelope => return None,
        };

        Some(geometry)
    }

    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
            Geometry::Envelope(_) => GeometryType::Envelope,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(point) => point.is_none(),
            Geometry::LineString(coords) | Geometry::MultiPoint(coords) => coords.is_empty(),
            Geometry::Polygon(rings) => rings.is_empty(),
            Geometry::MultiLineString(lines) => lines.is_empty(),
            Geometry::MultiPolygon(polygons) => polygons.is_empty(),
            Geometry::GeometryCollection(members) => members.is_empty(),
            Geometry::Envelope(_) => false,
        }
    }

    /// Smallest envelope containing every coordinate, `None` when empty.
    pub fn bounds(&self) -> Option<Envelope> {
        match self {
            Geometry::Envelope(envelope) => Some(*envelope),
            Geometry::GeometryCollection(members) => {
                let mut bounds: Option<Envelope> = None;
                for member in members.iter().filter_map(Geometry::bounds) {
                    bounds = Some(match bounds {
                        Some(mut acc) => {
                            acc.expand(&member);
                            acc
                        },
                        None => member,
                    });
                }
                bounds
            },
            _ => {
                let mut coords = self.coordinates();
                let first = coords.next()?;
                let mut bounds = Envelope::new(first.x, first.y, first.x, first.y);
                for c in coords {
                    bounds.expand(&Envelope::new(c.x, c.y, c.x, c.y));
                }
                Some(bounds)
            },
        }
    }

    /// Planar area; holes are subtracted from their shell.
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Polygon(rings) => polygon_area(rings),
            Geometry::MultiPolygon(polygons) => polygons.iter().map(|p| polygon_area(p)).sum(),
            Geometry::GeometryCollection(members) => members.iter().map(Geometry::area).sum(),
            Geometry::Envelope(envelope) => envelope.width() * envelope.height(),
            _ => 0.0,
        }
    }

    /// Planar length of lines, or perimeter of areal geometries.
    pub fn length(&self) -> f64 {
        match self {
            Geometry::LineString(coords) => path_length(coords),
            Geometry::MultiLineString(lines) => lines.iter().map(|l| path_length(l)).sum(),
            Geometry::Polygon(rings) => rings.iter().map(|r| path_length(r)).sum(),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .flat_map(|rings| rings.iter())
                .map(|r| path_length(r))
                .sum(),
            Geometry::GeometryCollection(members) => members.iter().map(Geometry::length).sum(),
            Geometry::Envelope(envelope) => 2.0 * (envelope.width() + envelope.height()),
            Geometry::Point(_) | Geometry::MultiPoint(_) => 0.0,
        }
    }

    fn coordinates(&self) -> Box<dyn Iterator<Item = &Coordinate> + '_> {
        match self {
            Geometry::Point(point) => Box::new(point.iter()),
            Geometry::LineString(coords) | Geometry::MultiPoint(coords) => Box::new(coords.iter()),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => Box::new(rings.iter().flatten()),
            Geometry::MultiPolygon(polygons) => Box::new(polygons.iter().flatten().flatten()),
            Geometry::GeometryCollection(members) => Box::new(members.iter().flat_map(Geometry::coordinates)),
            Geometry::Envelope(_) => Box::new(std::iter::empty()),
        }
    }
}

fn path_length(coords: &[Coordinate]) -> f64 {
    coords.windows(2).map(|pair| pair[0].distance(&pair[1])).sum()
}

fn ring_area(ring: &[Coordinate]) -> f64 {
    let twice: f64 = ring
        .windows(2)
        .map(|pair| pair[0].x * pair[1].y - pair[1].x * pair[0].y)
        .sum();

    (twice / 2.0).abs()
}

fn polygon_area(rings: &[Ring]) -> f64 {
    let mut rings = rings.iter();
    let shell = match rings.next() {
        Some(shell) => ring_area(shell),
        None => return 0.0,
    };

    shell - rings.map(|hole| ring_area(hole)).sum::<f64>()
}
