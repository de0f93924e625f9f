use serde::Serialize;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema, strum_macros::Display,
)]
pub enum ChannelFamily {
    A,
    B,
    E,
    F,
    R,
    D,
    U,
    O,
    L,
    H,
}

/// One named channel: nominal center and the range it may plausibly occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChannelBand {
    pub family: ChannelFamily,
    /// 1 based.
    pub number: u8,
    pub center_mhz: u32,
    pub start_mhz: u32,
    pub end_mhz: u32,
}

impl ChannelBand {
    pub fn name(&self) -> String {
        format!("{}{}", self.family, self.number)
    }

    pub fn contains(&self, frequency_mhz: f64) -> bool {
        frequency_mhz >= f64::from(self.start_mhz) && frequency_mhz <= f64::from(self.end_mhz)
    }
}

type Row = (ChannelFamily, [(u32, u32, u32); 8]);

// (center, start, end) per channel, in channel order.
const STANDARD: [Row; 10] = [
    (
        ChannelFamily::A,
        [
            (5865, 5850, 5880),
            (5845, 5830, 5860),
            (5825, 5810, 5840),
            (5805, 5790, 5820),
            (5785, 5770, 5800),
            (5765, 5750, 5780),
            (5745, 5730, 5760),
            (5725, 5710, 5740),
        ],
    ),
    (
        ChannelFamily::B,
        [
            (5733, 5718, 5748),
            (5752, 5737, 5767),
            (5771, 5756, 5786),
            (5790, 5775, 5805),
            (5809, 5794, 5824),
            (5828, 5813, 5843),
            (5847, 5832, 5862),
            (5866, 5851, 5881),
        ],
    ),
    (
        ChannelFamily::E,
        [
            (5705, 5690, 5720),
            (5685, 5670, 5700),
            (5665, 5650, 5680),
            (5645, 5630, 5660),
            (5885, 5870, 5900),
            (5905, 5890, 5920),
            (5925, 5910, 5940),
            (5945, 5930, 5960),
        ],
    ),
    (
        ChannelFamily::F,
        [
            (5740, 5725, 5755),
            (5760, 5745, 5775),
            (5780, 5765, 5795),
            (5800, 5785, 5815),
            (5820, 5805, 5835),
            (5840, 5825, 5855),
            (5860, 5845, 5875),
            (5880, 5865, 5895),
        ],
    ),
    (
        ChannelFamily::R,
        [
            (5658, 5643, 5673),
            (5695, 5679, 5709),
            (5732, 5716, 5746),
            (5769, 5753, 5783),
            (5806, 5790, 5820),
            (5843, 5827, 5857),
            (5880, 5864, 5894),
            (5917, 5901, 5931),
        ],
    ),
    (
        ChannelFamily::D,
        [
            (5362, 5347, 5377),
            (5399, 5384, 5414),
            (5436, 5421, 5451),
            (5473, 5458, 5488),
            (5510, 5495, 5525),
            (5547, 5532, 5562),
            (5584, 5569, 5599),
            (5621, 5606, 5636),
        ],
    ),
    (
        ChannelFamily::U,
        [
            (5325, 5300, 5330),
            (5348, 5323, 5353),
            (5366, 5341, 5371),
            (5384, 5359, 5389),
            (5402, 5377, 5407),
            (5420, 5395, 5425),
            (5438, 5413, 5443),
            (5456, 5431, 5461),
        ],
    ),
    (
        ChannelFamily::O,
        [
            (5474, 5459, 5489),
            (5492, 5477, 5507),
            (5510, 5495, 5525),
            (5528, 5513, 5543),
            (5546, 5531, 5561),
            (5564, 5549, 5579),
            (5582, 5567, 5597),
            (5600, 5585, 5615),
        ],
    ),
    (
        ChannelFamily::L,
        [
            (5333, 5318, 5348),
            (5373, 5358, 5388),
            (5413, 5398, 5428),
            (5453, 5438, 5468),
            (5493, 5478, 5508),
            (5533, 5518, 5548),
            (5573, 5558, 5588),
            (5613, 5598, 5628),
        ],
    ),
    (
        ChannelFamily::H,
        [
            (5653, 5638, 5668),
            (5693, 5678, 5708),
            (5733, 5718, 5748),
            (5773, 5758, 5788),
            (5813, 5798, 5828),
            (5853, 5838, 5868),
            (5893, 5878, 5908),
            (5933, 5918, 5948),
        ],
    ),
];

/// Immutable channel reference table, in family then channel order.
#[derive(Debug, Clone)]
pub struct ChannelTable {
    bands: Vec<ChannelBand>,
}

impl ChannelTable {
    pub fn standard() -> Self {
        let bands = STANDARD
            .iter()
            .flat_map(|(family, rows)| {
                rows.iter()
                    .enumerate()
                    .map(move |(i, &(center_mhz, start_mhz, end_mhz))| ChannelBand {
                        family: *family,
                        number: i as u8 + 1,
                        center_mhz,
                        start_mhz,
                        end_mhz,
                    })
            })
            .collect();
        Self { bands }
    }

    pub fn bands(&self) -> &[ChannelBand] {
        &self.bands
    }

    pub fn find(&self, name: &str) -> Option<&ChannelBand> {
        self.bands.iter().find(|b| b.name() == name)
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::standard()
    }
}
