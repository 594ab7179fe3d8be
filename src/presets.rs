// src/presets.rs
use serde::Serialize;

pub const SUPPORTED_ASPECT_RATIOS: &[&str] = &["9:16", "1:1", "4:5", "16:9"];

pub const VARIATION_COUNTS: &[usize] = &[3, 6, 9];

pub const BRAND_FONTS: &[&str] = &[
    "Playfair Display",
    "Montserrat",
    "Lobster",
    "Pacifico",
    "Cinzel",
];

pub const DEFAULT_BACKGROUND: &str = "minimal studio with soft, diffused lighting";

pub const DEFAULT_CAMERA_ANGLES: &[&str] = &[
    "front view, gentle smile, looking straight into the lens",
    "three-quarter angle, confident attitude",
    "full body, fashion pose",
    "low angle shot looking up, powerful expression",
    "close-up headshot, professional expression",
    "slightly turned, looking over the shoulder, mysterious expression",
    "medium shot of the upper body, hands in trouser pockets",
    "full body, walking",
    "front view, hands on hips",
];

#[derive(Debug, Serialize)]
pub struct BackgroundCategory {
    pub title: &'static str,
    pub items: &'static [&'static str],
}

pub const BACKGROUND_SUGGESTIONS: &[BackgroundCategory] = &[
    BackgroundCategory {
        title: "Vietnamese landmarks",
        items: &[
            "Hoan Kiem Lake and The Huc Bridge, Hanoi",
            "Hoi An ancient town at night",
            "Ha Long Bay aboard a cruise boat",
            "Sapa rice terraces",
            "Imperial City of Hue",
            "My Khe beach, Da Nang",
            "Notre-Dame Cathedral, Saigon",
            "Bustling Ben Thanh market",
            "Mui Ne sand dunes, Phan Thiet",
            "Sao beach, Phu Quoc island",
        ],
    },
    BackgroundCategory {
        title: "Cafes and restaurants",
        items: &[
            "Saigon garden cafe",
            "Indochine style cafe",
            "Minimalist cafe",
            "English afternoon tea room",
            "Hanoi street pho stall",
            "Upscale rooftop restaurant",
            "Cosy family eatery",
            "Balcony cafe in an old apartment block",
            "Sidewalk draft beer stall",
            "Romantic riverside restaurant",
        ],
    },
    BackgroundCategory {
        title: "Homes",
        items: &[
            "Modern living room with a city view",
            "Cosy bedroom with wooden furniture",
            "Minimalist kitchen with an island",
            "Green balcony corner with plants",
            "Reading room with a large bookshelf",
            "Private rooftop terrace",
            "Old house in Hanoi",
            "Bright studio apartment",
            "Luxurious bathroom with a bathtub",
            "Small backyard garden",
        ],
    },
    BackgroundCategory {
        title: "Countryside and nature",
        items: &[
            "Village road shaded by bamboo",
            "Golden ripe rice field",
            "Hanoi daisy flower garden",
            "Ben Tre coconut forest",
            "Lotus pond at sunrise",
            "Cai Rang floating market, Can Tho",
            "Moc Chau tea hills",
            "Beside a crystal clear stream",
            "Cuc Phuong national park",
            "Beside a Central Highlands stilt house",
        ],
    },
    BackgroundCategory {
        title: "Everyday street life",
        items: &[
            "Hanoi street in autumn with falling yellow leaves",
            "Busy Saigon street corner with traffic",
            "Riding in a cyclo",
            "In front of an old school gate",
            "Inside a modern supermarket",
            "Train station platform",
            "Lunar New Year flower market",
            "Park in the early morning",
            "On a pedestrian bridge",
            "Next to a street vendor's shoulder pole",
        ],
    },
];
