//! Built-in sample listings, used by the fixture listing source and the dev seed endpoint.

use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;

use crate::models::*;

fn contact(phone: &str, zalo: Option<&str>) -> Contact {
    Contact { phone: phone.into(), zalo: zalo.map(Into::into), ..Default::default() }
}

static SEED: Lazy<Vec<NewListing>> = Lazy::new(|| {
    vec![
        NewListing {
            id: Some("rm-seed1".into()),
            category: Category::Roommate,
            roommate_type: Some(RoommateType::HaveRoom),
            title: "Tìm bạn nữ ở ghép căn hộ Quận 7".into(),
            description: "Phòng rộng, có ban công, gần Lotte Mart. Mình làm văn phòng, sống gọn gàng.".into(),
            price: "3500000".into(),
            city: Some("Hồ Chí Minh".into()),
            district: Some("Quận 7".into()),
            building_name: Some("Sunrise City".into()),
            move_in_date: Some("Đầu tháng sau".into()),
            property_types: vec![PropertyType::Apartment],
            amenities: vec![Amenity::AirConditioner, Amenity::WashingMachine, Amenity::Wifi, Amenity::Elevator],
            costs: Costs {
                rent: Some("3500000".into()),
                deposit: Some("1 tháng".into()),
                electricity: Some("3500đ/kWh".into()),
                water: Some("100000đ/người".into()),
                ..Default::default()
            },
            preferences: Preferences {
                gender: vec![GenderPreference::Female],
                status: vec![OccupationPreference::OfficeWorker, OccupationPreference::Student],
                cleanliness: vec![CleanlinessPreference::Clean],
                habits: vec![HabitPreference::NoSmoking],
                ..Default::default()
            },
            room_size: Some("18".into()),
            current_occupants: Some("1".into()),
            contact: contact("0901234567", Some("0901234567")),
            ..Default::default()
        },
        NewListing {
            id: Some("rm-seed2".into()),
            category: Category::Roommate,
            roommate_type: Some(RoommateType::FindPartner),
            title: "Sinh viên tìm bạn cùng thuê phòng gần ĐH Bách Khoa".into(),
            description: "Mình là nam, năm 3, tìm bạn cùng thuê phòng khu Lý Thường Kiệt.".into(),
            price: "2000000".into(),
            city: Some("Hồ Chí Minh".into()),
            district: Some("Quận 10".into()),
            preferences: Preferences {
                gender: vec![GenderPreference::Male],
                status: vec![OccupationPreference::Student],
                schedule: vec![SchedulePreference::NightOwl],
                move_in_time: vec![MoveInTime::WithinMonth],
                ..Default::default()
            },
            contact: contact("0912 345 678", None),
            ..Default::default()
        },
        NewListing {
            id: Some("rs-seed1".into()),
            category: Category::Roomshare,
            title: "Cho thuê phòng trong nhà nguyên căn Bình Thạnh".into(),
            description: "Nhà 3 tầng, còn 1 phòng trống, bếp chung, giờ giấc tự do.".into(),
            price: "4000000".into(),
            city: Some("Hồ Chí Minh".into()),
            district: Some("Bình Thạnh".into()),
            specific_address: Some("Đường Xô Viết Nghệ Tĩnh".into()),
            property_types: vec![PropertyType::House],
            amenities: vec![Amenity::Kitchen, Amenity::Parking, Amenity::Wifi, Amenity::PrivateBathroom],
            total_rooms: Some("4".into()),
            current_occupants: Some("3".into()),
            preferences: Preferences {
                pets: vec![PetPreference::CatsOk],
                ..Default::default()
            },
            contact: contact("0987654321", Some("0987654321")),
            ..Default::default()
        },
        NewListing {
            id: Some("st-seed1".into()),
            category: Category::ShortTerm,
            title: "Studio ngắn hạn theo tuần ở Hoàn Kiếm".into(),
            description: "Studio đầy đủ nội thất, thuê tối thiểu 1 tuần.".into(),
            price: "1500000".into(),
            city: Some("Hà Nội".into()),
            district: Some("Hoàn Kiếm".into()),
            property_types: vec![PropertyType::Studio],
            amenities: vec![Amenity::Furniture, Amenity::WaterHeater, Amenity::AirConditioner],
            min_contract_duration: Some("1 tuần".into()),
            contact: contact("0934567890", None),
            ..Default::default()
        },
        NewListing {
            id: Some("sl-seed1".into()),
            category: Category::Sublease,
            title: "Sang lại hợp đồng căn hộ mini Cầu Giấy".into(),
            description: "Chuyển công tác nên cần sang lại, hợp đồng còn 6 tháng.".into(),
            price: "5500000".into(),
            city: Some("Hà Nội".into()),
            district: Some("Cầu Giấy".into()),
            property_types: vec![PropertyType::MiniApartment],
            amenities: vec![Amenity::Balcony, Amenity::Fridge, Amenity::Security],
            costs: Costs {
                deposit: Some("5500000".into()),
                service: Some("200000".into()),
                ..Default::default()
            },
            room_size: Some("30".into()),
            contact: contact("0356789012", Some("0356789012")),
            ..Default::default()
        },
    ]
});

/// Listings created by the seed endpoint. Seeded listings are published immediately.
pub fn seed_listings() -> Vec<NewListing> {
    SEED.iter()
        .cloned()
        .map(|mut n| {
            n.status = Some(ListingStatus::Active);
            n
        })
        .collect()
}

fn fixture_epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_717_200_000, 0).single().unwrap_or_default()
}

/// The seed set as stored records, with fixed timestamps one day apart.
pub fn sample_listings() -> Vec<Listing> {
    seed_listings()
        .into_iter()
        .enumerate()
        .filter_map(|(i, n)| {
            let id = n.id.clone()?;
            let at = fixture_epoch() - Duration::days(i as i64);
            Some(n.into_listing(id, ListingStatus::Active, at))
        })
        .collect()
}
